//! Zotero local API reader.
//!
//! Pages through `GET {base}/items` in batches of 100, skipping attachment
//! and note items, and converts the JSON payload into `ItemRecord`s. When
//! full text is requested, each item's `/fulltext` endpoint is queried
//! individually; items without extracted text simply keep `fulltext: None`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::library::{ItemMetadata, ItemRecord, LibrarySource, SourceError};

/// Page size for the items endpoint, matching the Zotero API maximum.
const PAGE_SIZE: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ZoteroApiSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    key: String,
    #[serde(default)]
    data: ApiItemData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiItemData {
    #[serde(default)]
    item_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    abstract_note: String,
    #[serde(default)]
    publication_title: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    date_modified: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "DOI", default)]
    doi: String,
    #[serde(default)]
    note: String,
    #[serde(default)]
    creators: Vec<ApiCreator>,
    #[serde(default)]
    tags: Vec<ApiTag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCreator {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    #[serde(default)]
    tag: String,
}

#[derive(Debug, Deserialize)]
struct FulltextResponse {
    #[serde(default)]
    content: String,
}

impl ZoteroApiSource {
    /// `base_url` points at a user prefix, e.g.
    /// `http://localhost:23119/api/users/0`.
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn fetch_page(&self, start: usize) -> Result<Vec<ApiItem>, SourceError> {
        let url = format!(
            "{}/items?start={start}&limit={PAGE_SIZE}&format=json",
            self.base_url
        );

        let response = self.client.get(&url).send().map_err(map_connect_error)?;

        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "library API returned {} for {url}",
                response.status()
            )));
        }

        response
            .json::<Vec<ApiItem>>()
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }

    fn fetch_fulltext(&self, key: &str) -> Option<String> {
        let url = format!("{}/items/{key}/fulltext", self.base_url);

        let response = match self.client.get(&url).send() {
            Ok(r) => r,
            Err(e) => {
                log::warn!("fulltext request for {key} failed: {e}");
                return None;
            }
        };

        // 404 means no extracted text exists for this item.
        if !response.status().is_success() {
            return None;
        }

        match response.json::<FulltextResponse>() {
            Ok(body) if !body.content.trim().is_empty() => Some(body.content),
            Ok(_) => None,
            Err(e) => {
                log::warn!("fulltext response for {key} unreadable: {e}");
                None
            }
        }
    }
}

impl LibrarySource for ZoteroApiSource {
    fn list_items(
        &self,
        since: Option<DateTime<Utc>>,
        include_fulltext: bool,
    ) -> Result<Vec<ItemRecord>, SourceError> {
        let mut records = Vec::new();
        let mut start = 0;

        loop {
            let page = self.fetch_page(start)?;
            let page_len = page.len();

            for item in page {
                // Attachments and notes are children of real items.
                if matches!(item.data.item_type.as_str(), "attachment" | "note") {
                    continue;
                }

                let mut record = convert_item(item);

                if let (Some(since), Some(modified)) = (since, record.modified_at) {
                    if modified < since {
                        continue;
                    }
                }

                if include_fulltext {
                    record.fulltext = self.fetch_fulltext(&record.key);
                }

                records.push(record);
            }

            if page_len < PAGE_SIZE {
                break;
            }
            start += PAGE_SIZE;
        }

        log::info!("library snapshot: {} items", records.len());
        Ok(records)
    }
}

fn map_connect_error(err: reqwest::Error) -> SourceError {
    if err.is_connect() {
        return SourceError::Unavailable(
            "cannot connect to the Zotero local API; make sure Zotero is running, \
             its HTTP server is enabled (Preferences > Advanced), and port 23119 \
             is not blocked"
                .to_string(),
        );
    }
    SourceError::Unavailable(err.to_string())
}

fn convert_item(item: ApiItem) -> ItemRecord {
    let data = item.data;

    let creators = format_creators(&data.creators);
    let tags: Vec<String> = data
        .tags
        .into_iter()
        .map(|t| t.tag)
        .filter(|t| !t.is_empty())
        .collect();

    let modified_at = DateTime::parse_from_rfc3339(&data.date_modified)
        .ok()
        .map(|dt| dt.with_timezone(&Utc));

    ItemRecord {
        key: item.key,
        title: data.title.clone(),
        abstract_text: data.abstract_note,
        note: data.note,
        fulltext: None,
        modified_at,
        metadata: ItemMetadata {
            item_type: data.item_type,
            title: data.title,
            creators,
            date: data.date,
            publication: data.publication_title,
            url: data.url,
            doi: data.doi,
            tags,
        },
    }
}

/// "Last, First; Last, First" for structured creators, the literal name for
/// institutional ones.
fn format_creators(creators: &[ApiCreator]) -> String {
    let names: Vec<String> = creators
        .iter()
        .filter_map(|c| {
            if !c.last_name.is_empty() && !c.first_name.is_empty() {
                Some(format!("{}, {}", c.last_name, c.first_name))
            } else if !c.name.is_empty() {
                Some(c.name.clone())
            } else if !c.last_name.is_empty() {
                Some(c.last_name.clone())
            } else {
                None
            }
        })
        .collect();

    names.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM_JSON: &str = r#"{
        "key": "ABCD1234",
        "version": 120,
        "data": {
            "key": "ABCD1234",
            "itemType": "journalArticle",
            "title": "Attention Is All You Need",
            "abstractNote": "We propose the Transformer.",
            "publicationTitle": "NeurIPS",
            "date": "2017",
            "dateModified": "2024-03-01T10:00:00Z",
            "url": "https://example.org/attention",
            "DOI": "10.5555/3295222",
            "creators": [
                {"creatorType": "author", "firstName": "Ashish", "lastName": "Vaswani"},
                {"creatorType": "author", "name": "Google Brain"}
            ],
            "tags": [{"tag": "transformers"}, {"tag": "attention"}]
        }
    }"#;

    #[test]
    fn parses_api_item() {
        let item: ApiItem = serde_json::from_str(ITEM_JSON).unwrap();
        let record = convert_item(item);

        assert_eq!(record.key, "ABCD1234");
        assert_eq!(record.title, "Attention Is All You Need");
        assert_eq!(record.abstract_text, "We propose the Transformer.");
        assert_eq!(record.metadata.creators, "Vaswani, Ashish; Google Brain");
        assert_eq!(record.metadata.publication, "NeurIPS");
        assert_eq!(record.metadata.doi, "10.5555/3295222");
        assert_eq!(record.metadata.tags, vec!["transformers", "attention"]);
        assert!(record.modified_at.is_some());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let item: ApiItem =
            serde_json::from_str(r#"{"key": "K1", "data": {"itemType": "book"}}"#).unwrap();
        let record = convert_item(item);

        assert_eq!(record.key, "K1");
        assert_eq!(record.metadata.item_type, "book");
        assert!(record.title.is_empty());
        assert!(record.metadata.creators.is_empty());
        assert!(record.modified_at.is_none());
    }

    #[test]
    fn formats_creator_variants() {
        let creators = vec![
            ApiCreator {
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                name: String::new(),
            },
            ApiCreator {
                first_name: String::new(),
                last_name: "Solo".into(),
                name: String::new(),
            },
        ];
        assert_eq!(format_creators(&creators), "Doe, Jane; Solo");
        assert_eq!(format_creators(&[]), "");
    }
}
