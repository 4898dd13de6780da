//! mEDRA DOI registration agency.
//!
//! mEDRA answers metadata requests with ONIX for DOI XML; the journal title is
//! the text of the first `TitleText` element in the ONIX DOI namespace.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use reqwest::StatusCode;

use crate::sources::{MetadataRegistry, RegistryAnswer, SourceError};
use crate::utils::HttpClient;

const MEDRA_API_BASE: &str = "https://api.medra.org";

/// Namespace every element of a mEDRA metadata record lives in
pub const ONIX_DOI_NAMESPACE: &str = "http://www.editeur.org/onix/DOIMetadata/2.0";

/// Element holding the serial (journal) title
pub const TITLE_TEXT_ELEMENT: &str = "TitleText";

/// mEDRA metadata registry
#[derive(Debug, Clone)]
pub struct MedraSource {
    client: HttpClient,
    base_url: String,
}

impl MedraSource {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, MEDRA_API_BASE)
    }

    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetadataRegistry for MedraSource {
    fn id(&self) -> &str {
        "medra"
    }

    fn name(&self) -> &str {
        "mEDRA"
    }

    async fn lookup_journal(&self, encoded_doi: &str) -> Result<RegistryAnswer, SourceError> {
        let url = format!("{}/metadata/{}", self.base_url, encoded_doi);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch DOI from mEDRA: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!(
                "mEDRA has no record for {}",
                encoded_doi
            )));
        }

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "mEDRA API returned status: {}",
                response.status()
            )));
        }

        let body = response.bytes().await?;

        extract_title_text(&body)
            .map(RegistryAnswer::Journal)
            .ok_or_else(|| {
                SourceError::Parse(format!(
                    "mEDRA record for {} has no {} element",
                    encoded_doi, TITLE_TEXT_ELEMENT
                ))
            })
    }
}

/// Text of the first namespaced `TitleText` element, if any
pub fn extract_title_text(xml: &[u8]) -> Option<String> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_title = false;
    let mut title = String::new();

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ResolveResult::Bound(Namespace(ns)), Event::Start(e)))
                if !in_title
                    && ns == ONIX_DOI_NAMESPACE.as_bytes()
                    && e.local_name().as_ref() == TITLE_TEXT_ELEMENT.as_bytes() =>
            {
                in_title = true;
            }
            // An empty first title decides the result
            Ok((ResolveResult::Bound(Namespace(ns)), Event::Empty(e)))
                if !in_title
                    && ns == ONIX_DOI_NAMESPACE.as_bytes()
                    && e.local_name().as_ref() == TITLE_TEXT_ELEMENT.as_bytes() =>
            {
                break;
            }
            Ok((_, Event::Text(text))) if in_title => {
                title.push_str(&text.unescape().ok()?);
            }
            Ok((_, Event::CData(data))) if in_title => {
                title.push_str(&String::from_utf8_lossy(&data.into_inner()));
            }
            // Only the text before the first child element counts
            Ok((_, Event::Start(_))) | Ok((_, Event::End(_))) if in_title => break,
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                tracing::debug!("Malformed mEDRA XML: {}", e);
                return None;
            }
            _ => {}
        }
        buf.clear();
    }

    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const RECORD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ONIXDOISerialArticleWorkRegistrationMessage xmlns="http://www.editeur.org/onix/DOIMetadata/2.0">
  <DOISerialArticleWork>
    <DOI>10.1400/123456</DOI>
    <SerialPublication>
      <SerialWork>
        <Title language="ita">
          <TitleType>01</TitleType>
          <TitleText>Rivista di Studi &amp; Ricerche</TitleText>
        </Title>
      </SerialWork>
    </SerialPublication>
    <ContentItem>
      <Title>
        <TitleText>An Article Title</TitleText>
      </Title>
    </ContentItem>
  </DOISerialArticleWork>
</ONIXDOISerialArticleWorkRegistrationMessage>"#;

    #[test]
    fn test_extract_first_title_text() {
        assert_eq!(
            extract_title_text(RECORD.as_bytes()),
            Some("Rivista di Studi & Ricerche".to_string())
        );
    }

    #[test]
    fn test_extract_prefixed_namespace() {
        let xml = r#"<o:Message xmlns:o="http://www.editeur.org/onix/DOIMetadata/2.0">
            <o:TitleText>Prefixed Journal</o:TitleText>
        </o:Message>"#;
        assert_eq!(
            extract_title_text(xml.as_bytes()),
            Some("Prefixed Journal".to_string())
        );
    }

    #[test]
    fn test_extract_ignores_other_namespaces() {
        let xml = r#"<Message xmlns="http://example.com/other">
            <TitleText>Wrong Namespace</TitleText>
        </Message>"#;
        assert_eq!(extract_title_text(xml.as_bytes()), None);
    }

    #[test]
    fn test_extract_missing_or_malformed() {
        assert_eq!(extract_title_text(b""), None);
        assert_eq!(
            extract_title_text(
                br#"<M xmlns="http://www.editeur.org/onix/DOIMetadata/2.0"><TitleText/></M>"#
            ),
            None
        );
        assert_eq!(extract_title_text(b"not xml <<<"), None);
    }

    #[test]
    fn test_empty_serial_title_does_not_fall_through() {
        let xml = r#"<ONIXDOISerialArticleWorkRegistrationMessage xmlns="http://www.editeur.org/onix/DOIMetadata/2.0">
  <DOISerialArticleWork>
    <SerialPublication>
      <SerialWork>
        <Title><TitleType>01</TitleType><TitleText/></Title>
      </SerialWork>
    </SerialPublication>
    <ContentItem>
      <Title><TitleText>An Article Title</TitleText></Title>
    </ContentItem>
  </DOISerialArticleWork>
</ONIXDOISerialArticleWorkRegistrationMessage>"#;
        assert_eq!(extract_title_text(xml.as_bytes()), None);
    }

    #[tokio::test]
    async fn test_lookup_journal() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/metadata/10.1400%2F123456")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(RECORD)
            .create_async()
            .await;

        let source = MedraSource::with_base_url(HttpClient::new().unwrap(), &server.url());
        let answer = source.lookup_journal("10.1400%2F123456").await.unwrap();
        assert_eq!(
            answer,
            RegistryAnswer::Journal("Rivista di Studi & Ricerche".to_string())
        );
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/metadata/10.9999%2Fmissing")
            .with_status(404)
            .create_async()
            .await;

        let source = MedraSource::with_base_url(HttpClient::new().unwrap(), &server.url());
        let err = source.lookup_journal("10.9999%2Fmissing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
