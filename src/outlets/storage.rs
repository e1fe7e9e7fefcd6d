// cloud-imager/src/outlets/storage.rs
use super::{Outlet, OutletRef};
use crate::core::{Context, FileNameFormat, ImagerConfig, ImagerError, Result};
use crate::processors::ImageHandle;
use crate::utils::{ensure_contained, join_key, to_slash};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::sync::Arc;

const AMAZON_PROVIDER: &str = "amazon";
const US_STANDARD_REGION: &str = "us-standard";

/// Where and how one object is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub container: String,
    pub remote: String,
    pub headers: BTreeMap<String, String>,
}

/// Remote object store the bytes are streamed to.
pub trait StorageClient: Send + Sync {
    /// Provider identity, e.g. `amazon`.
    fn provider(&self) -> &str;

    fn protocol(&self) -> &str {
        "https://"
    }

    /// Host used for default URLs when no region is configured.
    fn servers_url(&self) -> &str;

    fn region(&self) -> Option<&str> {
        None
    }

    /// Uploads `body`; `Ok(false)` means the store did not take the object.
    fn upload(&self, request: &UploadRequest, body: &mut dyn Read) -> Result<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct ObjectStorageOptions {
    pub base_url: Option<String>,
    /// Sent with every upload; wins over the computed defaults.
    pub headers: BTreeMap<String, String>,
    pub upload_directory: Option<String>,
    pub file_name_format: Option<FileNameFormat>,
    pub include_size: bool,
}

impl ObjectStorageOptions {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn upload_directory(mut self, dir: impl Into<String>) -> Self {
        self.upload_directory = Some(dir.into());
        self
    }

    pub fn file_name_format(mut self, format: impl Into<FileNameFormat>) -> Self {
        self.file_name_format = Some(format.into());
        self
    }

    pub fn include_size(mut self, include: bool) -> Self {
        self.include_size = include;
        self
    }
}

/// Streams artifacts into a container of a remote object store.
pub struct ObjectStorageOutlet {
    client: Arc<dyn StorageClient>,
    container: String,
    base_url: String,
    options: ObjectStorageOptions,
}

impl ObjectStorageOutlet {
    pub fn new(
        client: Arc<dyn StorageClient>,
        container: impl Into<String>,
        options: ObjectStorageOptions,
    ) -> Self {
        let container = container.into();
        let base_url = options
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(client.as_ref(), &container));

        Self {
            client,
            container,
            base_url,
            options,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Object key for `context`, including the upload directory.
    pub fn remote_key(&self, context: &Context<'_>, config: &ImagerConfig) -> Result<String> {
        let name = config.format_file_name(self.options.file_name_format.as_ref(), context);
        ensure_contained(&name)?;

        let dir = self
            .options
            .upload_directory
            .clone()
            .or_else(|| config.upload_directory().map(to_slash));

        Ok(match dir {
            Some(dir) => join_key(&dir, &name),
            None => name,
        })
    }

    fn request(&self, remote: String, context: &Context<'_>) -> UploadRequest {
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            context.image.declared_type().to_string(),
        );
        if self.client.provider() == AMAZON_PROVIDER {
            headers.insert("x-amz-acl".to_string(), "public-read".to_string());
        }
        headers.extend(
            self.options
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        UploadRequest {
            container: self.container.clone(),
            remote,
            headers,
        }
    }

    fn upload(&self, request: &UploadRequest, body: &mut dyn Read) -> Result<()> {
        if self.client.upload(request, body)? {
            log::info!("Uploaded {}/{}", request.container, request.remote);
            Ok(())
        } else {
            Err(ImagerError::ProcessingError(format!(
                "Upload of {}/{} was not accepted",
                request.container, request.remote
            )))
        }
    }
}

impl fmt::Debug for ObjectStorageOutlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStorageOutlet")
            .field("provider", &self.client.provider())
            .field("container", &self.container)
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish()
    }
}

impl Outlet for ObjectStorageOutlet {
    fn persist(
        &self,
        handle: &mut dyn ImageHandle,
        context: &Context<'_>,
        config: &ImagerConfig,
    ) -> Result<OutletRef> {
        let remote = self.remote_key(context, config)?;
        let request = self.request(remote, context);
        let url = format!("{}{}", self.base_url, request.remote);

        if self.options.include_size {
            // The size has to come from the encoded file, so stage it locally.
            let staging = tempfile::tempdir()?;
            let staged = staging.path().join(format!(
                "{}{}{}{}",
                context.image.uid(),
                context.preset,
                context.variant().unwrap_or_default(),
                context.image.mime_extension()
            ));
            handle.write(&staged)?;
            let size = config.image_manipulator().open(&staged)?.size()?;
            let mut file = File::open(&staged)?;
            self.upload(&request, &mut file)?;
            return Ok(OutletRef::Sized { url, size });
        }

        let mut body = handle.stream()?;
        self.upload(&request, &mut body)?;
        Ok(OutletRef::Url(url))
    }
}

fn default_base_url(client: &dyn StorageClient, container: &str) -> String {
    let domain = match client.region() {
        Some(region) if region != US_STANDARD_REGION => format!("s3-{}.amazonaws.com", region),
        Some(_) => "s3.amazonaws.com".to_string(),
        None => client.servers_url().to_string(),
    };
    format!("{}{}/{}/", client.protocol(), domain, container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExtensionMimeLookup, FileDescriptor};
    use crate::test_utils::MockManipulator;
    use std::sync::Mutex;

    struct FakeStore {
        provider: &'static str,
        region: Option<&'static str>,
        accept: bool,
        uploads: Mutex<Vec<(UploadRequest, Vec<u8>)>>,
    }

    impl FakeStore {
        fn new(provider: &'static str, region: Option<&'static str>) -> Self {
            Self {
                provider,
                region,
                accept: true,
                uploads: Mutex::new(Vec::new()),
            }
        }
    }

    impl StorageClient for FakeStore {
        fn provider(&self) -> &str {
            self.provider
        }

        fn servers_url(&self) -> &str {
            "storage.example.net"
        }

        fn region(&self) -> Option<&str> {
            self.region
        }

        fn upload(&self, request: &UploadRequest, body: &mut dyn Read) -> Result<bool> {
            let mut bytes = Vec::new();
            body.read_to_end(&mut bytes)?;
            self.uploads.lock().unwrap().push((request.clone(), bytes));
            Ok(self.accept)
        }
    }

    fn fixture() -> (FileDescriptor, ImagerConfig) {
        let image = FileDescriptor::new("cat.png".into(), &ExtensionMimeLookup).unwrap();
        let mut config = ImagerConfig::default();
        config.set_file_name_format("{{basename}}{{prefixedVariant}}{{mimeExtension}}");
        config.set_image_manipulator(Arc::new(MockManipulator::with_size(32, 16)));
        (image, config)
    }

    #[test]
    fn default_base_urls() {
        let amazon = FakeStore::new("amazon", Some("eu-west-1"));
        assert_eq!(
            default_base_url(&amazon, "bucket"),
            "https://s3-eu-west-1.amazonaws.com/bucket/"
        );
        let standard = FakeStore::new("amazon", Some("us-standard"));
        assert_eq!(
            default_base_url(&standard, "bucket"),
            "https://s3.amazonaws.com/bucket/"
        );
        let other = FakeStore::new("rackspace", None);
        assert_eq!(
            default_base_url(&other, "media"),
            "https://storage.example.net/media/"
        );
    }

    #[test]
    fn uploads_stream_with_headers() {
        let (image, config) = fixture();
        let store = Arc::new(FakeStore::new("amazon", None));
        let outlet = ObjectStorageOutlet::new(
            store.clone(),
            "bucket",
            ObjectStorageOptions::default()
                .base_url("https://cdn.example.com/")
                .upload_directory("avatars")
                .header("Cache-Control", "max-age=60")
                .header("x-amz-acl", "private"),
        );
        let mut handle = config.image_manipulator().open(image.path()).unwrap();

        let reference = outlet
            .persist(handle.as_mut(), &Context::new(&image, "default", "thumb"), &config)
            .unwrap();

        assert_eq!(
            reference,
            OutletRef::Url("https://cdn.example.com/avatars/cat_thumb.png".into())
        );
        let uploads = store.uploads.lock().unwrap();
        let (request, bytes) = &uploads[0];
        assert_eq!(request.container, "bucket");
        assert_eq!(request.remote, "avatars/cat_thumb.png");
        assert_eq!(request.headers["content-type"], "image/png");
        assert_eq!(request.headers["cache-control"], "max-age=60");
        assert_eq!(request.headers["x-amz-acl"], "private");
        assert_eq!(bytes.as_slice(), b"mock image");
    }

    #[test]
    fn public_read_only_for_amazon() {
        let (image, _config) = fixture();
        let store = Arc::new(FakeStore::new("openstack", None));
        let outlet = ObjectStorageOutlet::new(store, "c", ObjectStorageOptions::default());
        let request = outlet.request("k".into(), &Context::new(&image, "p", "v"));
        assert!(!request.headers.contains_key("x-amz-acl"));
        assert_eq!(request.headers["content-type"], "image/png");
    }

    #[test]
    fn include_size_stages_and_reports_dimensions() {
        let (image, config) = fixture();
        let store = Arc::new(FakeStore::new("amazon", Some("us-standard")));
        let outlet = ObjectStorageOutlet::new(
            store.clone(),
            "bucket",
            ObjectStorageOptions::default().include_size(true),
        );
        let mut handle = config.image_manipulator().open(image.path()).unwrap();
        let reference = outlet
            .persist(handle.as_mut(), &Context::new(&image, "default", "original"), &config)
            .unwrap();
        assert_eq!(
            reference,
            OutletRef::Sized {
                url: "https://s3.amazonaws.com/bucket/cat.png".into(),
                size: crate::core::Dimensions::new(32, 16),
            }
        );
        assert_eq!(store.uploads.lock().unwrap()[0].1.as_slice(), b"mock image");
    }

    #[test]
    fn refused_upload_is_an_error() {
        let (image, config) = fixture();
        let mut store = FakeStore::new("amazon", None);
        store.accept = false;
        let outlet = ObjectStorageOutlet::new(Arc::new(store), "b", ObjectStorageOptions::default());
        let mut handle = config.image_manipulator().open(image.path()).unwrap();
        assert!(outlet
            .persist(handle.as_mut(), &Context::new(&image, "p", "v"), &config)
            .is_err());
    }
}
