use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;

use bpaf::{Bpaf, Parser};
use kontrol_a49::{Bitmap, Key, KontrolA49, INFO};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::media::encode_bitmap;

mod config;
mod demo;
mod media;

/// Utility for parsing usb ids as decimal or `0x` prefixed hex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UsbId(u16);
impl FromStr for UsbId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => s.parse(),
        };
        parsed
            .map(Self)
            .map_err(|e| format!("invalid usb id {s}: {e}"))
    }
}

/// Utility for parsing `KEY=LEVEL` light assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyLevel {
    key: Key,
    level: u8,
}
impl FromStr for KeyLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, level) = s.split_once('=').unwrap_or((s, "255"));
        let key = key.parse::<Key>().map_err(|e| e.to_string())?;
        let level = match level.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => level.parse(),
        }
        .map_err(|e| format!("invalid level for {key}: {e}"))?;
        Ok(Self { key, level })
    }
}

#[derive(Clone, Debug, Bpaf)]
enum LightsArgs {
    All {
        /// Set every key to the same level (0-255)
        #[bpaf(short('a'), long("all"), argument("LEVEL"))]
        level: u8,
    },
    Keys {
        /// Keys to light, unlisted keys turn off. Level defaults to 255
        #[bpaf(positional("KEY[=LEVEL]"))]
        keys: Vec<KeyLevel>,
    },
}

#[derive(Clone, Debug, Bpaf)]
enum Command {
    /// Print key, rotary and octave events as they arrive
    #[bpaf(command)]
    Watch {
        /// Light keys while they are held
        #[bpaf(short, long)]
        echo: bool,
    },
    /// Set the key lights
    #[bpaf(command)]
    Lights(#[bpaf(external(lights_args))] LightsArgs),
    /// Draw an image on the display
    #[bpaf(command, fallback_to_usage)]
    Image {
        /// Set bits for dark pixels instead of bright ones
        #[bpaf(short, long)]
        invert: bool,
        /// Use nearest neighbor interpolation when resizing, otherwise uses gaussian
        #[bpaf(short('n'), long("nearest"))]
        nearest: bool,
        /// Luma cut-off between set and cleared bits
        #[bpaf(short, long, argument("LUMA"))]
        threshold: Option<u8>,
        /// Path to image to convert and draw
        #[bpaf(positional("PATH"), guard(|p| p.exists(), "file not found"))]
        path: PathBuf,
    },
    /// Blank the display and turn off every light
    #[bpaf(command)]
    Clear,
    /// Bounce a box around the display until STOP is pressed
    #[bpaf(command)]
    Bounce,
    /// List key names in hardware order
    #[bpaf(command)]
    Keys,
}

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version, descr(env!("CARGO_PKG_DESCRIPTION")))]
struct Cli {
    /// Override the usb vendor id
    #[bpaf(long("vendor-id"), argument("ID"))]
    vendor_id: Option<UsbId>,
    /// Override the usb product id
    #[bpaf(long("product-id"), argument("ID"))]
    product_id: Option<UsbId>,
    /// Enable debug logging
    #[bpaf(short, long)]
    verbose: bool,
    #[bpaf(external(command))]
    command: Command,
}

/// Install the log subscriber. `RUST_LOG` wins over the verbose flag.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_board(cli: &Cli, config: &Config) -> Result<KontrolA49, Box<dyn Error>> {
    let vendor_id = cli.vendor_id.map_or(config.device.vendor_id, |id| id.0);
    let product_id = cli.product_id.map_or(config.device.product_id, |id| id.0);
    let mut board = KontrolA49::open_with_ids(vendor_id, product_id)?;
    board.set_read_timeout(config.device.read_timeout_ms());
    println!("connected to {} ({vendor_id:04x}:{product_id:04x})", INFO.name);
    Ok(board)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = cli().run();
    init_logging(cli.verbose);

    if let Command::Keys = cli.command {
        for key in Key::ALL {
            println!("{:>2} {key}", key.index());
        }
        return Ok(());
    }

    let config = Config::load_or_create()?;
    let mut board = open_board(&cli, &config)?;

    match cli.command {
        Command::Watch { echo } => {
            let echo = (echo || config.watch.echo_lights).then_some(config.watch.echo_level);
            demo::watch(&mut board, echo)
        },
        Command::Lights(LightsArgs::All { level }) => {
            board.set_all_keys(level, true)?;
            println!("set all lights to {level}");
            Ok(())
        },
        Command::Lights(LightsArgs::Keys { keys }) => {
            board.set_all_keys(0, false)?;
            for KeyLevel { key, level } in &keys {
                board.set_key_light(*key, *level, false)?;
            }
            board.send_key_lights()?;
            println!("set {} lights", keys.len());
            Ok(())
        },
        Command::Image {
            invert,
            nearest,
            threshold,
            path,
        } => {
            let image = ::image::open(&path)?;
            let bitmap = encode_bitmap(
                &image,
                threshold.unwrap_or(config.display.threshold),
                invert != config.display.invert,
                nearest || config.display.use_nearest_neighbor,
            );
            board.send_image(&bitmap)?;
            println!("drew {}", path.display());
            Ok(())
        },
        Command::Clear => {
            board.send_image(&Bitmap::filled())?;
            board.set_all_keys(0, true)?;
            println!("cleared display and lights");
            Ok(())
        },
        Command::Bounce => demo::bounce(&mut board, &config.bounce),
        Command::Keys => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_usb_ids() {
        assert_eq!("0x17cc".parse::<UsbId>(), Ok(UsbId(0x17cc)));
        assert_eq!("5952".parse::<UsbId>(), Ok(UsbId(0x1740)));
        assert!("0xzz".parse::<UsbId>().is_err());
        assert!("70000".parse::<UsbId>().is_err());
    }

    #[test]
    fn parse_key_levels() {
        assert_eq!(
            "play=0x40".parse::<KeyLevel>(),
            Ok(KeyLevel {
                key: Key::Play,
                level: 0x40
            })
        );
        assert_eq!(
            "STOP".parse::<KeyLevel>(),
            Ok(KeyLevel {
                key: Key::Stop,
                level: 255
            })
        );
        assert!("PLAY=300".parse::<KeyLevel>().is_err());
        assert!("NOPE=1".parse::<KeyLevel>().is_err());
    }

    #[test]
    fn cli_parses_commands() {
        let parsed = cli()
            .run_inner(&["--vendor-id", "0x17cc", "lights", "PLAY=255", "STOP"])
            .unwrap();
        assert_eq!(parsed.vendor_id, Some(UsbId(0x17cc)));
        match parsed.command {
            Command::Lights(LightsArgs::Keys { keys }) => assert_eq!(keys.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }

        let parsed = cli().run_inner(&["lights", "--all", "7"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Lights(LightsArgs::All { level: 7 })
        ));

        let parsed = cli().run_inner(&["watch", "--echo"]).unwrap();
        assert!(matches!(parsed.command, Command::Watch { echo: true }));
    }
}
