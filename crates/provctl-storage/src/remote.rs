use aws_sdk_s3::Client;
use provctl_core::State;

use crate::error::StorageError;
use crate::objects;

/// Remote copy of the state document in S3.
///
/// The local file stays the safety net; S3 is the copy other operators and
/// machines read from.
#[derive(Clone)]
pub struct S3Mirror {
    pub client: Client,
    pub bucket: String,
    pub key: String,
}

impl S3Mirror {
    pub fn new(client: Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Build a client from the default AWS credential chain for `region`.
    pub async fn from_env(
        region: &str,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        Self::new(Client::new(&config), bucket, key)
    }

    /// Load the mirrored state. `Ok(None)` when nothing has been uploaded yet.
    pub async fn load(&self) -> Result<Option<State>, StorageError> {
        match objects::get_object(&self.client, &self.bucket, &self.key).await {
            Ok(body) => Ok(Some(State::from_json(&body)?)),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Upload the state document. Returns the new ETag.
    pub async fn save(&self, state: &State) -> Result<String, StorageError> {
        let body = serde_json::to_vec_pretty(state)?;
        objects::put_object(
            &self.client,
            &self.bucket,
            &self.key,
            body,
            Some("application/json"),
        )
        .await
    }
}
