//! S3-compatible object store backend.
//!
//! Works against AWS S3 and S3-compatible services (MinIO, LocalStack) via a
//! custom endpoint with path-style addressing. Source and destination may be
//! different endpoints; the destination client falls back to the source when
//! the configuration does not distinguish them.
//!
//! The backend owns a private current-thread tokio runtime and blocks on
//! each SDK call, so the chunking engine stays synchronous. Objects are
//! buffered whole on read: the tool exists to consolidate small objects.

use std::io::{Cursor, Read};
use std::path::Path;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::{RemoteConfig, S3Config};
use crate::error::{StoreError, StoreResult};
use crate::object::ObjectRef;
use crate::traits::{join_key, Backend};

/// S3 implementation of [`Backend`].
pub struct S3Backend {
    runtime: Runtime,
    src: Client,
    dst: Client,
    src_host: String,
    dst_host: String,
}

impl S3Backend {
    /// Connect to the endpoints described by `config`.
    pub fn connect(config: &RemoteConfig) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Init(e.to_string()))?;

        let src = client_for(&config.src);
        let dst = if config.src == config.dst {
            src.clone()
        } else {
            client_for(&config.dst)
        };

        Ok(Self {
            runtime,
            src,
            dst,
            src_host: config.src.host.clone(),
            dst_host: config.dst.host.clone(),
        })
    }
}

fn client_for(config: &S3Config) -> Client {
    let credentials = Credentials::new(
        config.access_key.clone(),
        config.secret_key.clone(),
        None,
        None,
        "frag",
    );
    let conf = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .endpoint_url(config.host.clone())
        .credentials_provider(credentials)
        // Path-style addressing keeps MinIO and LocalStack working.
        .force_path_style(true)
        .build();
    Client::from_conf(conf)
}

impl Backend for S3Backend {
    fn list_objects(&self, folder: &str, prefix: &str) -> StoreResult<Vec<ObjectRef>> {
        self.runtime.block_on(async {
            let mut objects = Vec::new();
            let mut start_after: Option<String> = None;
            loop {
                let resp = self
                    .src
                    .list_objects_v2()
                    .bucket(folder)
                    .prefix(prefix)
                    .set_start_after(start_after.take())
                    .send()
                    .await
                    .map_err(|e| StoreError::List {
                        path: folder.to_string(),
                        reason: DisplayErrorContext(e).to_string(),
                    })?;

                let contents = resp.contents();
                if contents.is_empty() {
                    break;
                }
                start_after = contents.last().and_then(|o| o.key()).map(str::to_string);
                for obj in contents {
                    let name = obj.key().unwrap_or_default().to_string();
                    let size = obj.size().unwrap_or(0).max(0) as u64;
                    objects.push(ObjectRef::new(name, size));
                }
                debug!(bucket = folder, listed = objects.len(), "listing page fetched");
            }
            Ok(objects)
        })
    }

    fn get_object(&self, folder: &str, name: &str) -> StoreResult<Box<dyn Read + Send>> {
        let data = self.runtime.block_on(async {
            let resp = self
                .src
                .get_object()
                .bucket(folder)
                .key(name)
                .send()
                .await
                .map_err(|e| StoreError::Read {
                    path: join_key(&[folder, name]),
                    reason: DisplayErrorContext(e).to_string(),
                })?;
            resp.body
                .collect()
                .await
                .map(|b| b.into_bytes())
                .map_err(|e| StoreError::Read {
                    path: join_key(&[folder, name]),
                    reason: e.to_string(),
                })
        })?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn write_object(
        &self,
        artifact: &Path,
        folder: &str,
        name: &str,
        prefix: &str,
    ) -> StoreResult<()> {
        let key = join_key(&[prefix, name]);
        let dest = join_key(&[folder, &key]);
        self.runtime.block_on(async {
            let body = ByteStream::from_path(artifact)
                .await
                .map_err(|e| StoreError::Write {
                    path: dest.clone(),
                    reason: e.to_string(),
                })?;
            self.dst
                .put_object()
                .bucket(folder)
                .key(&key)
                .body(body)
                .send()
                .await
                .map_err(|e| StoreError::Write {
                    path: dest.clone(),
                    reason: DisplayErrorContext(e).to_string(),
                })?;
            Ok(())
        })
    }

    fn delete_objects(&self, folder: &str, objects: &[ObjectRef]) -> StoreResult<()> {
        if objects.is_empty() {
            return Ok(());
        }
        let wrap = |reason: String| StoreError::Delete {
            path: folder.to_string(),
            reason,
        };

        let identifiers = objects
            .iter()
            .map(|o| ObjectIdentifier::builder().key(&o.name).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| wrap(e.to_string()))?;
        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .build()
            .map_err(|e| wrap(e.to_string()))?;

        self.runtime.block_on(async {
            self.src
                .delete_objects()
                .bucket(folder)
                .delete(delete)
                .send()
                .await
                .map_err(|e| wrap(DisplayErrorContext(e).to_string()))?;
            Ok(())
        })
    }

    fn info(&self) -> String {
        format!("s3 [src={}, dst={}]", self.src_host, self.dst_host)
    }
}
