//! Leads list (`leads/{leadId}`)

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{Lead, LeadFilter};
use crate::store::{Change, Store};

/// Read access to leads, plus bulk import
#[derive(Clone)]
pub struct LeadStore {
    store: Store,
}

impl LeadStore {
    /// Create a lead store over the shared store
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Add (or replace) a lead
    pub async fn insert(&self, lead: &Lead) -> Result<()> {
        if lead.name.trim().is_empty() {
            return Err(Error::invalid("lead name is required"));
        }
        self.store.write(Change::Leads, |db| db.upsert_lead(lead)).await
    }

    /// Leads passing `filter`, most recently contacted first
    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
        self.store.read(|db| db.get_leads(filter)).await
    }

    /// Load a JSON array of leads from a file; returns how many were stored
    pub async fn import_file(&self, path: &Path) -> Result<usize> {
        let content = tokio::fs::read_to_string(path).await?;
        let leads: Vec<Lead> = serde_json::from_str(&content)
            .map_err(|e| Error::invalid(format!("{}: {e}", path.display())))?;

        for lead in &leads {
            self.insert(lead).await?;
        }
        tracing::info!(count = leads.len(), "leads imported");
        Ok(leads.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCipher;
    use crate::db::Database;
    use crate::models::{LeadSource, LeadStatus};
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn leads(dir: &tempfile::TempDir) -> LeadStore {
        let db = Database::open_path(
            &dir.path().join("leads.sqlite"),
            TokenCipher::from_key([7u8; 32]),
            true,
        )
        .unwrap();
        LeadStore::new(Store::new(db))
    }

    #[tokio::test]
    async fn test_import_and_filter() {
        let dir = tempdir().unwrap();
        let store = leads(&dir);
        let file = dir.path().join("leads.json");
        let recent = Utc::now();
        let older = recent - Duration::days(3);
        std::fs::write(
            &file,
            serde_json::json!([
                { "name": "Budi Santoso", "phone": "0812-1111", "status": "HOT",
                  "platform": "WHATSAPP", "last_contact_at": older },
                { "name": "Siti Aminah", "phone": "0813-2222", "last_contact_at": recent }
            ])
            .to_string(),
        )
        .unwrap();

        assert_eq!(store.import_file(&file).await.unwrap(), 2);

        let all = store.list(&LeadFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            vec!["Siti Aminah", "Budi Santoso"]
        );
        assert_eq!(all[0].platform, LeadSource::Web);

        let hot = store
            .list(&LeadFilter {
                status: Some(LeadStatus::Hot),
                search: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(hot.len(), 1);

        let by_name = store
            .list(&LeadFilter {
                status: None,
                search: "siti".into(),
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert!(all.iter().all(|l| LeadFilter::default().matches(l)));
    }

    #[tokio::test]
    async fn test_bad_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(&file, "{ not json").unwrap();
        assert_eq!(
            leads(&dir).import_file(&file).await.unwrap_err().code(),
            "invalid-argument"
        );
    }
}
