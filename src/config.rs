//! Configuration file handling

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use kontrol_a49::consts;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub display: DisplayConfig,
    pub watch: WatchConfig,
    pub bounce: BounceConfig,
}

impl Config {
    /// Get the config file path for this platform
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "kontrol-sync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from file, or create default if it doesn't exist
    pub fn load_or_create() -> Result<Self, Box<dyn Error>> {
        let path = Self::path().ok_or("could not determine config directory")?;

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let config = Config::default();
            config.save_with_header(&path)?;
            println!("created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config with header comments for new files
    fn save_with_header(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = "# kontrol-sync configuration file\n\n";
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// USB vendor id
    pub vendor_id: u16,
    /// USB product id
    pub product_id: u16,
    /// How long each read waits for an input report
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: consts::A49_VENDOR_ID,
            product_id: consts::A49_PRODUCT_ID,
            read_timeout: Duration::from_millis(consts::DEFAULT_READ_TIMEOUT_MS as u64),
        }
    }
}

impl DeviceConfig {
    /// Read timeout in the millisecond form hidapi expects
    pub fn read_timeout_ms(&self) -> i32 {
        self.read_timeout.as_millis().min(i32::MAX as u128) as i32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Luma at or above which a pixel is lit
    pub threshold: u8,
    /// Light dark pixels instead of bright ones
    pub invert: bool,
    /// Use nearest neighbor interpolation when resizing
    pub use_nearest_neighbor: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            threshold: 128,
            invert: false,
            use_nearest_neighbor: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Light keys while they are held
    pub echo_lights: bool,
    /// Brightness used for echoed keys
    pub echo_level: u8,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            echo_lights: false,
            echo_level: 0xff,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceConfig {
    /// Delay between frames
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
    pub box_width: u32,
    pub box_height: u32,
}

impl Default for BounceConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(50),
            box_width: 24,
            box_height: 16,
        }
    }
}
