use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_CAS_RETRIES;
use crate::store::{keys, Store, StoreError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DomainTally {
    pub correct: u64,
    pub total: u64,
}

/// Running per-domain counters for one user on one exam.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainMastery {
    pub user_id: String,
    pub exam_id: String,
    pub domains: BTreeMap<String, DomainTally>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn get_domain_mastery(
        &self,
        user_id: &str,
        exam_id: &str,
    ) -> Result<Option<DomainMastery>, StoreError> {
        let key = keys::domain_mastery_key(user_id, exam_id)?;
        match self.domain_mastery.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Adds the given per-domain deltas to the aggregate, creating it if needed.
    pub fn merge_domain_mastery(
        &self,
        user_id: &str,
        exam_id: &str,
        deltas: &BTreeMap<String, DomainTally>,
    ) -> Result<DomainMastery, StoreError> {
        let key = keys::domain_mastery_key(user_id, exam_id)?;

        for _ in 0..MAX_CAS_RETRIES {
            let current_raw = self.domain_mastery.get(key.as_bytes())?;
            let mut mastery = match &current_raw {
                Some(raw) => Self::deserialize::<DomainMastery>(raw)?,
                None => DomainMastery {
                    user_id: user_id.to_string(),
                    exam_id: exam_id.to_string(),
                    domains: BTreeMap::new(),
                    updated_at: Utc::now(),
                },
            };

            for (domain, delta) in deltas {
                let tally = mastery.domains.entry(domain.clone()).or_default();
                tally.correct += delta.correct;
                tally.total += delta.total;
            }
            mastery.updated_at = Utc::now();

            let next = Self::serialize(&mastery)?;
            if self
                .domain_mastery
                .compare_and_swap(key.as_bytes(), current_raw, Some(next))?
                .is_ok()
            {
                return Ok(mastery);
            }
        }

        Err(StoreError::CasRetryExhausted {
            entity: "domain_mastery".to_string(),
            key,
            attempts: MAX_CAS_RETRIES,
        })
    }
}
