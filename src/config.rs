use lazy_static::lazy_static;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::RwLock;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::new());
}

/// Process-wide demuxer defaults, loaded from the environment or a config file
#[derive(Debug, Clone)]
pub struct Config {
    /// Packet size override applied when a demuxer is built without one
    pub packet_size: Option<usize>,
}

impl Config {
    fn new() -> Self {
        // Default: auto-detect the packet size from the stream
        let mut config = Config { packet_size: None };

        // Try loading from environment variables first
        if let Ok(size) = env::var("TSIO_PACKET_SIZE") {
            if let Ok(size) = size.trim().parse() {
                config.packet_size = Some(size);
            }
        }

        // Then try loading from config file
        let config_paths = ["./config.toml", "./tsio_config.toml"];
        for path in &config_paths {
            if let Ok(mut file) = File::open(path) {
                let mut content = String::new();
                if file.read_to_string(&mut content).is_ok() {
                    if let Some(line) = content
                        .lines()
                        .find(|line| line.starts_with("packet_size"))
                    {
                        if let Some(size) = line.split('=').nth(1) {
                            if let Ok(size) = size.trim().parse() {
                                config.packet_size = Some(size);
                            }
                        }
                    }
                }
            }
        }

        config
    }

    /// Re-reads the configuration sources and swaps the shared state
    pub fn reload() {
        let new_config = Config::new();
        if let Ok(mut config) = CONFIG.write() {
            *config = new_config;
        }
    }
}

/// Returns the configured packet size override, if any
pub fn get_packet_size() -> Option<usize> {
    CONFIG.read().unwrap().packet_size
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# TSIO Configuration
# This is a template. Replace the values with your actual configuration.

# Transport stream packet size override (188, 192 or 204).
# packet_size = 188
"#;
        std::fs::write(path, template)?;
    }
    Ok(())
}
