//! Server configuration
//!
//! Every setting resolves CLI flag → environment variable (both via clap) →
//! `config.toml` → compiled default.

use clap::Parser;
use fitscan_common::config::{resolve_root_folder, RootFolder, TomlConfig, ROOT_FOLDER_ENV};
use std::path::PathBuf;

use crate::services::detection_normalizer::ImageDimensions;
use crate::services::vision::VisionConfig;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:4000";
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Command-line interface
#[derive(Debug, Default, Parser)]
#[command(name = "fitscan-server", version, about = "Fittings scan, inventory and invoicing service")]
pub struct Cli {
    /// Folder holding the database, uploads and reference catalog
    #[arg(long, env = ROOT_FOLDER_ENV)]
    pub root_folder: Option<String>,

    /// Explicit config.toml path
    #[arg(long, env = "FITSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:4000
    #[arg(long, env = "FITSCAN_BIND")]
    pub bind: Option<String>,

    /// Directory for uploaded images (default: <root>/uploads)
    #[arg(long, env = "FITSCAN_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Reference catalog JSON (default: <root>/reference-catalog.json)
    #[arg(long, env = "FITSCAN_REFERENCE_CATALOG")]
    pub reference_catalog: Option<PathBuf>,

    /// Origin allowed by CORS
    #[arg(long, env = "FITSCAN_FRONTEND_ORIGIN")]
    pub frontend_origin: Option<String>,

    /// Base URL used to build image URLs (default: from the Host header)
    #[arg(long, env = "FITSCAN_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    #[arg(long, env = "OPENAI_VISION_MODEL")]
    pub openai_model: Option<String>,

    /// Remote vision service base URL
    #[arg(long, env = "VISION_SERVICE_URL")]
    pub vision_service_url: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root: RootFolder,
    pub bind_address: String,
    pub upload_dir: PathBuf,
    pub reference_catalog_path: PathBuf,
    pub frontend_origin: String,
    pub public_base_url: Option<String>,
    pub vision: VisionConfig,
}

impl ServerConfig {
    pub fn resolve(cli: &Cli, toml: &TomlConfig) -> Self {
        let root = RootFolder::new(resolve_root_folder(
            cli.root_folder.as_deref(),
            ROOT_FOLDER_ENV,
            toml,
        ));

        let upload_dir = cli
            .upload_dir
            .clone()
            .or_else(|| toml.upload_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| root.uploads_path());

        let reference_catalog_path = cli
            .reference_catalog
            .clone()
            .or_else(|| toml.reference_catalog.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| root.reference_catalog_path());

        let defaults = ImageDimensions::default();
        let vision = VisionConfig {
            openai_api_key: pick(&cli.openai_api_key, &toml.vision.openai_api_key)
                .filter(|k| is_valid_key(k)),
            openai_base_url: pick(&cli.openai_base_url, &toml.vision.openai_base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: pick(&cli.openai_model, &toml.vision.openai_model)
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            service_url: pick(&cli.vision_service_url, &toml.vision.service_url)
                .filter(|u| !u.trim().is_empty()),
            default_dimensions: ImageDimensions {
                width: toml.vision.default_image_width.unwrap_or(defaults.width),
                height: toml.vision.default_image_height.unwrap_or(defaults.height),
            },
        };

        Self {
            bind_address: pick(&cli.bind, &toml.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            upload_dir,
            reference_catalog_path,
            frontend_origin: pick(&cli.frontend_origin, &toml.frontend_origin)
                .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGIN.to_string()),
            public_base_url: pick(&cli.public_base_url, &toml.public_base_url),
            vision,
            root,
        }
    }
}

fn pick(cli: &Option<String>, toml: &Option<String>) -> Option<String> {
    cli.clone().or_else(|| toml.clone())
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
