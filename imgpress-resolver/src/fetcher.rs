//! Image downloading

use crate::{Result, UrlResolver};
use imgpress_core::{ImageAsset, ImageFormat};
use percent_encoding::percent_decode_str;
use reqwest::blocking::Client;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP settings for downloads
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("imgpress/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A file handed over by the host platform
#[derive(Debug, Clone)]
pub struct FileReference {
    /// Raw URL or path as received
    pub url: String,
    pub filename: Option<String>,
    /// Declared MIME type; checked before downloading
    pub mime_type: Option<String>,
}

impl FileReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Declared format, or `None` when no MIME type was given
    pub fn declared_format(&self) -> Result<Option<ImageFormat>> {
        Ok(self
            .mime_type
            .as_deref()
            .map(ImageFormat::from_mime)
            .transpose()?)
    }

    /// File name from the declaration, or the last path segment of the
    /// resolved `url`, percent-decoded.
    ///
    /// Names that would escape the current directory are dropped.
    pub fn file_name(&self, url: &Url) -> Option<String> {
        let name = match &self.filename {
            Some(name) => name.clone(),
            None => {
                let segment = url.path_segments()?.last()?;
                percent_decode_str(segment).decode_utf8_lossy().into_owned()
            }
        };
        let escapes = name == "." || name == ".." || name.contains(['/', '\\']);
        (!name.is_empty() && !escapes).then_some(name)
    }
}

/// Blocking HTTP client for image downloads
pub struct Fetcher {
    client: Client,
    resolver: UrlResolver,
}

impl Fetcher {
    /// Creates a fetcher that resolves references with `resolver`
    pub fn new(config: FetchConfig, resolver: UrlResolver) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self { client, resolver })
    }

    pub fn resolver(&self) -> &UrlResolver {
        &self.resolver
    }

    /// Downloads the body at `url`; non-2xx statuses are errors
    pub fn fetch_url(&self, url: &Url) -> Result<Vec<u8>> {
        debug!(%url, "downloading");
        let response = self.client.get(url.clone()).send()?.error_for_status()?;
        let bytes = response.bytes()?;
        info!(%url, bytes = bytes.len(), "downloaded");
        Ok(bytes.to_vec())
    }

    /// Resolves, checks and downloads a file reference.
    ///
    /// An unsupported declared MIME type fails before any request is made.
    pub fn fetch(&self, file: &FileReference) -> Result<ImageAsset> {
        let declared = file.declared_format()?;
        let url = self.resolver.resolve(&file.url)?;
        let data = self.fetch_url(&url)?;

        let asset = match declared {
            Some(format) => ImageAsset::with_format(data, format)?,
            None => ImageAsset::from_bytes(data)?,
        };
        Ok(match file.file_name(&url) {
            Some(name) => asset.with_file_name(name),
            None => asset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::{BufRead, BufReader, Cursor, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 6, Rgb([1, 2, 3])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    /// Serves one HTTP response on a local port and returns its base URL
    /// plus the request line it received
    fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 2 {
                line.clear();
            }

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
            request_line
        });

        (base, handle)
    }

    #[test]
    fn test_fetch_relative_reference() {
        let body = png_bytes();
        let (base, server) = serve_once("200 OK", body.clone());
        let fetcher = Fetcher::new(FetchConfig::default(), UrlResolver::new(Some(base))).unwrap();

        let file = FileReference::new("/files/tools/pic.png?sign=abc").with_mime_type("image/png");
        let asset = fetcher.fetch(&file).unwrap();

        assert_eq!(asset.data(), body.as_slice());
        assert_eq!(asset.format(), ImageFormat::Png);
        assert_eq!(asset.dimensions(), (12, 6));
        assert_eq!(asset.file_name(), Some("pic.png"));
        assert!(server
            .join()
            .unwrap()
            .starts_with("GET /files/tools/pic.png?sign=abc HTTP/1.1"));
    }

    #[test]
    fn test_fetch_http_error_status() {
        let (base, server) = serve_once("404 Not Found", Vec::new());
        let fetcher = Fetcher::new(FetchConfig::default(), UrlResolver::default()).unwrap();

        let file = FileReference::new(format!("{}/files/missing.png", base));
        let result = fetcher.fetch(&file);
        server.join().unwrap();

        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[test]
    fn test_unsupported_mime_fails_before_request() {
        let fetcher = Fetcher::new(FetchConfig::default(), UrlResolver::default()).unwrap();
        // Nothing listens here; reaching the network would be a different error
        let file = FileReference::new("http://127.0.0.1:9/doc.pdf").with_mime_type("application/pdf");

        let result = fetcher.fetch(&file);
        assert!(matches!(
            result,
            Err(Error::Core(imgpress_core::Error::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn test_malformed_reference_fails_before_request() {
        let fetcher = Fetcher::new(FetchConfig::default(), UrlResolver::default()).unwrap();
        let result = fetcher.fetch(&FileReference::new("/files/no-host.png"));
        assert!(matches!(result, Err(Error::MalformedReference(_))));
    }

    #[test]
    fn test_file_name() {
        let name = |reference: &str, url: &str| {
            FileReference::new(reference).file_name(&Url::parse(url).unwrap())
        };

        assert_eq!(
            name("/files/a/b.jpg?sign=1", "https://x.com/files/a/b.jpg?sign=1"),
            Some("b.jpg".to_string())
        );
        assert_eq!(name("https://x.com?sign=1", "https://x.com?sign=1"), None);
        assert_eq!(name("https://x.com/files/", "https://x.com/files/"), None);
        assert_eq!(
            name("/files/%E5%9B%BE.png", "https://x.com/files/%E5%9B%BE.png"),
            Some("\u{56fe}.png".to_string())
        );
        assert_eq!(name("/files/a%2Fb.png", "https://x.com/files/a%2Fb.png"), None);
        assert_eq!(name("/files/..", "https://x.com/files/%2E%2E"), None);

        let declared = FileReference::new("https://x.com/files/")
            .with_filename("named.jpg")
            .file_name(&Url::parse("https://x.com/files/").unwrap());
        assert_eq!(declared, Some("named.jpg".to_string()));
    }

    #[test]
    fn test_fetch_names_asset_from_resolved_url() {
        let (base, server) = serve_once("200 OK", png_bytes());
        let fetcher = Fetcher::new(FetchConfig::default(), UrlResolver::new(Some(base))).unwrap();

        let asset = fetcher.fetch(&FileReference::new("files/%E5%9B%BE.png?sign=1")).unwrap();
        server.join().unwrap();

        assert_eq!(asset.format(), ImageFormat::Png);
        assert_eq!(asset.file_name(), Some("\u{56fe}.png"));
    }
}
