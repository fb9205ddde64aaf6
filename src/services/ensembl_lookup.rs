use crate::error::Result;
use serde_json::Value;
use tracing::warn;

const ENSEMBL_REST_URL: &str = "https://rest.ensembl.org";

/// Client for the Ensembl REST cross-reference endpoint, used to map protein
/// accessions to Ensembl gene ids.
pub struct EnsemblLookup {
    client: reqwest::Client,
    base_url: String,
}

impl EnsemblLookup {
    pub fn new() -> Self {
        Self::with_base_url(ENSEMBL_REST_URL)
    }

    /// Point the client at a different endpoint (test servers, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Resolve a protein accession to an Ensembl gene id for the given
    /// organism (scientific name in `homo_sapiens` form).
    ///
    /// Lookup failures degrade to `None` after a logged warning; a failed
    /// mapping never aborts the batch.
    pub async fn gene_id(&self, organism: &str, accession: &str) -> Option<String> {
        match self.query_xrefs(organism, accession).await {
            Ok(gene_id) => {
                if gene_id.is_none() {
                    warn!(accession, "could not find an Ensembl gene id");
                }
                gene_id
            }
            Err(error) => {
                warn!(accession, %error, "Ensembl xref lookup failed; leaving gene id unmapped");
                None
            }
        }
    }

    async fn query_xrefs(&self, organism: &str, accession: &str) -> Result<Option<String>> {
        let url = format!("{}/xrefs/symbol/{}/{}", self.base_url, organism, accession);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("content-type", "application/json"),
                ("object_type", "gene"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(crate::error::IntegrationError::UpstreamService(format!(
                "xref endpoint returned {} for {}",
                response.status(),
                accession
            )));
        }
        let response: Value = response.json().await?;

        // The endpoint reports unknown accessions as {"error": ...}.
        if response.get("error").is_some() {
            return Ok(None);
        }

        Ok(response
            .as_array()
            .and_then(|matches| matches.first())
            .and_then(|entry| entry.get("id"))
            .and_then(Value::as_str)
            .map(String::from))
    }
}

impl Default for EnsemblLookup {
    fn default() -> Self {
        Self::new()
    }
}

/// Scientific organism name in the form the REST endpoint expects.
pub fn normalize_organism(scientific_name: &str) -> String {
    scientific_name.trim().replace(' ', "_").to_lowercase()
}
