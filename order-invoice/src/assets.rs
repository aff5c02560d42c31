//! Decorative assets (logo and font) shared by every request.
//!
//! Assets are loaded once at startup and are optional: a source that cannot be read, fetched or
//! decoded is logged and left out, and invoices are produced without it.

use std::{path::PathBuf, time::Duration};

use base64::{Engine, engine::general_purpose};
use printpdf::image_crate::{self, DynamicImage, GenericImageView, ImageFormat};
use tracing::{info, warn};

use crate::{
    error::{AddContext, Error},
    layout::LogoSize,
};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where an asset is read from: a local path or an http(s) URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Path(PathBuf),
    Url(String),
}

impl From<&str> for AssetSource {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            AssetSource::Url(value.to_string())
        } else {
            AssetSource::Path(PathBuf::from(value))
        }
    }
}

impl std::fmt::Display for AssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetSource::Path(path) => write!(f, "{}", path.display()),
            AssetSource::Url(url) => write!(f, "{url}"),
        }
    }
}

/// A decoded logo image
#[derive(Debug, Clone)]
pub struct Logo {
    bytes: Vec<u8>,
    mime: &'static str,
    image: DynamicImage,
    /// Remote address the logo was fetched from
    url: Option<String>,
}

impl Logo {
    /// Decode image bytes. PNG, JPEG, GIF and WebP are recognised.
    pub fn decode(bytes: Vec<u8>) -> Result<Logo, Error> {
        let format = image_crate::guess_format(&bytes)
            .map_err(|e| Error::asset(e.to_string()))
            .add_context("detecting logo format")?;
        let mime = match format {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            other => {
                return Err(Error::asset(format!("unsupported logo format {other:?}")));
            }
        };
        let image = image_crate::load_from_memory_with_format(&bytes, format)
            .map_err(|e| Error::asset(e.to_string()))
            .add_context("decoding logo")?;
        Ok(Logo {
            bytes,
            mime,
            image,
            url: None,
        })
    }

    /// Remember that the logo is published at `url`
    pub fn fetched_from(self, url: impl Into<String>) -> Logo {
        Logo {
            url: Some(url.into()),
            ..self
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn size(&self) -> LogoSize {
        let (width_px, height_px) = self.image.dimensions();
        LogoSize {
            width_px,
            height_px,
        }
    }

    /// The logo as a `data:` URL, for HTML documents
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Image source for HTML that is mailed. Many mail clients block `data:` images, so a
    /// logo fetched over http(s) is referenced at its remote address.
    pub fn mail_src(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => self.data_url(),
        }
    }
}

/// The optional assets available to every renderer
#[derive(Debug, Clone, Default)]
pub struct Assets {
    logo: Option<Logo>,
    font: Option<Vec<u8>>,
}

async fn read_source(client: &reqwest::Client, source: &AssetSource) -> Result<Vec<u8>, Error> {
    match source {
        AssetSource::Path(path) => Ok(tokio::fs::read(path).await?),
        AssetSource::Url(url) => {
            let response = client.get(url).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        }
    }
}

impl Assets {
    /// No logo and no font override
    pub fn none() -> Assets {
        Assets::default()
    }

    pub fn new(logo: Option<Logo>, font: Option<Vec<u8>>) -> Assets {
        Assets { logo, font }
    }

    /// Load the configured assets. Never fails; every asset that cannot be loaded is logged at
    /// warn level and left out.
    pub async fn load(logo: Option<AssetSource>, font: Option<AssetSource>) -> Assets {
        let client = match reqwest::Client::builder().timeout(FETCH_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "could not build http client, assets disabled");
                return Assets::none();
            }
        };

        let logo = match logo {
            Some(source) => {
                let loaded = read_source(&client, &source)
                    .await
                    .add_context("reading logo")
                    .and_then(Logo::decode)
                    .map(|logo| match &source {
                        AssetSource::Url(url) => logo.fetched_from(url.as_str()),
                        AssetSource::Path(_) => logo,
                    });
                match loaded {
                    Ok(logo) => {
                        info!(%source, width = logo.size().width_px, "logo loaded");
                        Some(logo)
                    }
                    Err(e) => {
                        warn!(%source, error = %e, "logo unavailable, invoices are rendered without it");
                        None
                    }
                }
            }
            None => None,
        };

        let font = match font {
            Some(source) => match read_source(&client, &source).await.add_context("reading font") {
                Ok(bytes) => {
                    info!(%source, "font loaded");
                    Some(bytes)
                }
                Err(e) => {
                    warn!(%source, error = %e, "font unavailable, using the bundled DejaVu Sans");
                    None
                }
            },
            None => None,
        };

        Assets { logo, font }
    }

    pub fn logo(&self) -> Option<&Logo> {
        self.logo.as_ref()
    }

    pub fn font(&self) -> Option<&[u8]> {
        self.font.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use printpdf::image_crate::{Rgb, RgbImage};

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 3, Rgb([180, 80, 115])));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{name}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn sources_are_told_apart() {
        assert_eq!(
            AssetSource::from("https://example.com/logo.png"),
            AssetSource::Url(String::from("https://example.com/logo.png"))
        );
        assert_eq!(
            AssetSource::from("./logo.png"),
            AssetSource::Path(PathBuf::from("./logo.png"))
        );
    }

    #[test]
    fn decodes_png_logo() {
        let logo = Logo::decode(png_bytes()).unwrap();
        assert_eq!(
            logo.size(),
            LogoSize {
                width_px: 6,
                height_px: 3
            }
        );
        assert!(logo.data_url().starts_with("data:image/png;base64,"));
        assert_eq!(logo.mail_src(), logo.data_url());
    }

    #[test]
    fn remote_logo_is_mailed_by_url() {
        let logo = Logo::decode(png_bytes())
            .unwrap()
            .fetched_from("https://beautybyella.lt/logo.png");
        assert_eq!(logo.mail_src(), "https://beautybyella.lt/logo.png");
        assert!(logo.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn garbage_is_not_a_logo() {
        assert!(Logo::decode(b"<html>not found</html>".to_vec()).is_err());
    }

    #[tokio::test]
    async fn missing_logo_file_leaves_logo_absent() {
        let assets = Assets::load(
            Some(AssetSource::Path(temp_path("missing.png"))),
            Some(AssetSource::Path(temp_path("missing.ttf"))),
        )
        .await;
        assert!(assets.logo().is_none());
        assert!(assets.font().is_none());
    }

    #[tokio::test]
    async fn undecodable_logo_is_dropped() {
        let path = temp_path("broken.png");
        tokio::fs::write(&path, b"definitely not an image").await.unwrap();
        let assets = Assets::load(Some(AssetSource::Path(path.clone())), None).await;
        assert!(assets.logo().is_none());
        tokio::fs::remove_file(path).await.unwrap();
    }

    #[tokio::test]
    async fn logo_file_is_loaded() {
        let path = temp_path("logo.png");
        tokio::fs::write(&path, png_bytes()).await.unwrap();
        let assets = Assets::load(Some(AssetSource::Path(path.clone())), None).await;
        assert_eq!(assets.logo().map(|l| l.size().width_px), Some(6));
        tokio::fs::remove_file(path).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_logo_url_leaves_logo_absent() {
        let assets = Assets::load(Some(AssetSource::from("http://127.0.0.1:9/logo.png")), None).await;
        assert!(assets.logo().is_none());
    }
}
