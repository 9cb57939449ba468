use crate::error::SecretError;
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Address of one value inside a named secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

impl SecretRef {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }

    fn read_error(&self, source: io::Error) -> SecretError {
        SecretError::Read {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            key: self.key.clone(),
            source,
        }
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret_value(&self, secret: &SecretRef) -> Result<String, SecretError>;
}

/// Reads the API token and rejects blank values.
pub async fn read_api_token(
    store: &dyn SecretStore,
    secret: &SecretRef,
) -> Result<String, SecretError> {
    let value = store.get_secret_value(secret).await?;
    let value = value.trim();
    if value.is_empty() {
        return Err(SecretError::Empty {
            namespace: secret.namespace.clone(),
            name: secret.name.clone(),
            key: secret.key.clone(),
        });
    }
    Ok(value.to_string())
}

/// Secrets mounted on disk as `<root>/<namespace>/<name>/<key>`.
#[derive(Debug, Clone)]
pub struct MountedSecretStore {
    root: PathBuf,
}

impl MountedSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, secret: &SecretRef) -> Result<PathBuf, SecretError> {
        let parts = [&secret.namespace, &secret.name, &secret.key];
        if parts.iter().any(|p| !is_single_normal_component(p)) {
            return Err(secret.read_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "secret namespace, name and key must be plain path segments",
            )));
        }
        Ok(parts.iter().fold(self.root.clone(), |path, p| path.join(p)))
    }
}

fn is_single_normal_component(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[async_trait]
impl SecretStore for MountedSecretStore {
    async fn get_secret_value(&self, secret: &SecretRef) -> Result<String, SecretError> {
        let path = self.path_of(secret)?;
        debug!(path = %path.display(), "reading mounted secret");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| secret.read_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "governor-secret-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn reads_and_trims_mounted_value() {
        let root = temp_root("read");
        let dir = root.join("cnsi-system").join("governor");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("accessSecret"), "api-token-1\n").unwrap();

        let store = MountedSecretStore::new(&root);
        let secret = SecretRef::new("cnsi-system", "governor", "accessSecret");
        let token = read_api_token(&store, &secret).await.unwrap();
        assert_eq!(token, "api-token-1");

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn missing_and_blank_values_fail() {
        let root = temp_root("blank");
        let dir = root.join("ns").join("name");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("blank"), "  \n").unwrap();
        let store = MountedSecretStore::new(&root);

        let missing = read_api_token(&store, &SecretRef::new("ns", "name", "absent")).await;
        assert!(matches!(missing, Err(SecretError::Read { .. })));

        let blank = read_api_token(&store, &SecretRef::new("ns", "name", "blank")).await;
        assert!(matches!(blank, Err(SecretError::Empty { .. })));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let store = MountedSecretStore::new("/etc/governor/secrets");
        let err = store
            .get_secret_value(&SecretRef::new("..", "name", "key"))
            .await
            .unwrap_err();
        match err {
            SecretError::Read { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidInput);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
