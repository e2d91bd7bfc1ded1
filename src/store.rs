//! The single flat JSON file behind everything.
//!
//! Every mutation anywhere in the server is a full read of this file, an
//! in-memory edit, and a full overwrite. There is deliberately no lock and
//! no revision counter: two interleaved read-modify-write cycles race, and
//! the last writer wins wholesale. That matches the observable behavior the
//! rest of the system is built around (see DESIGN.md) and is acceptable at
//! the small-group concurrency this server targets.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub nombre: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub nombre: String,
    pub tipo: String,
    pub participantes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sala_id: String,
    pub emisor_id: String,
    pub emisor_name: String,
    pub contenido: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub nombre: String,
    pub contenido: String,
    pub editores: Vec<String>,
}

/// The four top-level collections of the store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data {
    pub usuarios: Vec<User>,
    pub salas: Vec<Room>,
    pub mensajes: Vec<Message>,
    pub documentos: Vec<Document>,
}

impl Data {
    /// Defaults written on first access: no users (they are provisioned by
    /// editing the file), the single chat room, one empty document.
    pub fn seed() -> Self {
        Self {
            usuarios: Vec::new(),
            salas: vec![Room {
                id: "s1".to_owned(),
                nombre: "Sala General".to_owned(),
                tipo: "publica".to_owned(),
                participantes: Vec::new(),
            }],
            mensajes: Vec::new(),
            documentos: vec![Document {
                id: "d1".to_owned(),
                nombre: "Documento 1".to_owned(),
                contenido: String::new(),
                editores: Vec::new(),
            }],
        }
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.usuarios.iter().find(|u| u.id == id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.usuarios
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documentos.iter().find(|d| d.id == id)
    }

    pub fn document_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.documentos.iter_mut().find(|d| d.id == id)
    }
}

/// Handle to the store file. Cheap to clone; injected into every handler
/// through `AppState` so tests can point it at a throwaway path.
#[derive(Clone)]
pub struct Store {
    path: Arc<PathBuf>,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Arc::new(path.into()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and parse the file; if it does not exist yet, persist the seed
    /// defaults and return them.
    pub async fn read(&self) -> ApiResult<Data> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path().display(), "store missing, seeding defaults");
                let data = Data::seed();
                self.write(&data).await?;
                Ok(data)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Serialize the whole store and overwrite the file.
    pub async fn write(&self, data: &Data) -> ApiResult<()> {
        if let Some(dir) = self.path().parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(self.path(), json).await?;
        Ok(())
    }
}

/// Fresh entity id: a prefixed v7 uuid, so ids stay time-ordered and
/// sub-millisecond concurrent creations cannot collide.
pub fn fresh_id(prefix: char) -> String {
    format!("{prefix}{}", Uuid::now_v7().simple())
}

/// Current instant as an RFC 3339 UTC string, the store's timestamp format.
pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("current utc time formats as rfc3339")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("data.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn read_seeds_defaults_when_file_is_absent() {
        let (_dir, store) = temp_store();

        let data = store.read().await.unwrap();

        assert!(data.usuarios.is_empty());
        assert_eq!(data.salas[0].id, "s1");
        assert!(data.mensajes.is_empty());
        assert_eq!(data.documentos[0].id, "d1");
        // the seed was persisted, not just returned
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (_dir, store) = temp_store();
        let mut data = store.read().await.unwrap();
        data.usuarios.push(User {
            id: "u2".to_owned(),
            nombre: "Ana".to_owned(),
            email: "ana@x.com".to_owned(),
        });
        data.documentos[0].contenido = "draft text".to_owned();
        store.write(&data).await.unwrap();

        let reloaded = store.read().await.unwrap();
        assert_eq!(reloaded.user("u2").unwrap().nombre, "Ana");
        assert_eq!(reloaded.documentos[0].contenido, "draft text");
    }

    #[tokio::test]
    async fn wire_field_names_stay_camel_case() {
        let message = Message {
            id: "m1".to_owned(),
            sala_id: "s1".to_owned(),
            emisor_id: "u2".to_owned(),
            emisor_name: "Ana".to_owned(),
            contenido: "hola".to_owned(),
            timestamp: "2025-04-20T10:05:00Z".to_owned(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["salaId"], "s1");
        assert_eq!(json["emisorId"], "u2");
        assert_eq!(json["emisorName"], "Ana");
    }

    #[test]
    fn fresh_ids_are_prefixed_and_unique() {
        let a = fresh_id('m');
        let b = fresh_id('m');
        assert!(a.starts_with('m'));
        assert_ne!(a, b);
    }

    #[test]
    fn email_lookup_ignores_case() {
        let mut data = Data::seed();
        data.usuarios.push(User {
            id: "u2".to_owned(),
            nombre: "Ana".to_owned(),
            email: "ana@x.com".to_owned(),
        });
        assert_eq!(data.user_by_email("Ana@X.com").unwrap().id, "u2");
        assert!(data.user_by_email("luis@x.com").is_none());
    }
}
