//! SharePoint bridge adapter
//!
//! Implements the count / retrieve / search operations on top of the
//! qualification parser, URL builder, transport and feed parser.

use crate::bridge::{
    normalize_pagination_metadata, BridgeAdapter, BridgeRequest, Record, RecordList,
};
use crate::config::AdapterConfig;
use crate::error::{BridgeError, Result};
use crate::qualification::QualificationParser;
use crate::sharepoint::feed::{AtomDocument, AtomFeedParser, FeedParser};
use crate::sharepoint::query::{build_url, Structure};
use crate::sharepoint::transport::{HttpTransport, Transport};
use async_trait::async_trait;
use indexmap::IndexMap;

/// Adapter display name
pub const ADAPTER_NAME: &str = "Sharepoint Bridge";

/// Adapter version reported to the host
pub const ADAPTER_VERSION: &str = "1.0.0";

/// Bridge adapter for SharePoint lists
#[derive(Debug)]
pub struct SharepointAdapter<T = HttpTransport, P = AtomFeedParser> {
    config: AdapterConfig,
    transport: T,
    parser: P,
    qualification: QualificationParser,
}

impl SharepointAdapter {
    /// Create an adapter talking HTTP to the configured server
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_parts(config, transport, AtomFeedParser))
    }
}

impl<T: Transport, P: FeedParser> SharepointAdapter<T, P> {
    /// Create an adapter from explicit transport and parser implementations
    pub fn with_parts(config: AdapterConfig, transport: T, parser: P) -> Self {
        Self {
            config,
            transport,
            parser,
            qualification: QualificationParser::new(),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Validate, translate and execute the request, returning the parsed feed
    async fn fetch(&self, request: &BridgeRequest) -> Result<AtomDocument> {
        let structure: Structure = request.structure.parse()?;
        let query = self
            .qualification
            .parse(request.query.as_deref(), &request.parameters)?;
        let url = build_url(&self.config.server_url, structure, query.as_deref());

        tracing::debug!("Fetching: {}", url);

        let body = self.transport.execute(&url, &self.config.credentials).await?;
        self.parser.parse(&body)
    }

    /// Record holding `fields` for the entry at `index`
    fn record_at(&self, document: &AtomDocument, fields: &[String], index: usize) -> Record {
        let attributes: IndexMap<String, Option<String>> = fields
            .iter()
            .map(|field| {
                let value = document
                    .value(field, index, self.config.field_lookup)
                    .map(str::to_string);
                (field.clone(), value)
            })
            .collect();
        Record::new(attributes)
    }
}

#[async_trait]
impl<T: Transport, P: FeedParser> BridgeAdapter for SharepointAdapter<T, P> {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn version(&self) -> &str {
        ADAPTER_VERSION
    }

    async fn count(&self, request: &BridgeRequest) -> Result<u64> {
        tracing::trace!(
            structure = %request.structure,
            query = ?request.query,
            "Counting SharePoint records"
        );

        let document = self.fetch(request).await?;
        Ok(document.count_entries() as u64)
    }

    async fn retrieve(&self, request: &BridgeRequest) -> Result<Record> {
        tracing::trace!(
            structure = %request.structure,
            query = ?request.query,
            fields = %request.field_string(),
            "Retrieving SharePoint record"
        );

        let document = self.fetch(request).await?;

        let matches = document.count_entries();
        if matches > 1 {
            return Err(BridgeError::AmbiguousResult { matches });
        }
        if matches == 0 {
            return Ok(Record::empty());
        }

        // No requested fields means no data, even on a match
        match request.fields.as_deref() {
            Some(fields) if !fields.is_empty() => Ok(self.record_at(&document, fields, 0)),
            _ => Ok(Record::empty()),
        }
    }

    async fn search(&self, request: &BridgeRequest) -> Result<RecordList> {
        tracing::trace!(
            structure = %request.structure,
            query = ?request.query,
            fields = %request.field_string(),
            "Searching SharePoint records"
        );

        let metadata = normalize_pagination_metadata(&request.metadata);
        let document = self.fetch(request).await?;
        let entries = document.count_entries();

        let (fields, records) = match request.fields.as_ref() {
            Some(fields) => {
                let records = (0..entries)
                    .map(|index| self.record_at(&document, fields, index))
                    .collect();
                (fields.clone(), records)
            }
            None => (Vec::new(), vec![Record::empty(); entries]),
        };

        tracing::debug!("Search returned {} records", entries);

        Ok(RecordList {
            fields,
            records,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Metadata;
    use crate::config::Credentials;
    use crate::sharepoint::feed::FieldLookup;
    use crate::sharepoint::fixtures::feed;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Transport returning a fixed body and recording every call
    #[derive(Default)]
    struct SpyTransport {
        body: String,
        urls: Mutex<Vec<String>>,
        authorizations: Mutex<Vec<String>>,
    }

    impl SpyTransport {
        fn returning(body: impl Into<String>) -> Self {
            Self {
                body: body.into(),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.urls.lock().unwrap().len()
        }

        fn last_url(&self) -> Option<String> {
            self.urls.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl Transport for SpyTransport {
        async fn execute(&self, url: &str, credentials: &Credentials) -> Result<String> {
            self.urls.lock().unwrap().push(url.to_string());
            self.authorizations
                .lock()
                .unwrap()
                .push(credentials.username().to_string());
            Ok(self.body.clone())
        }
    }

    #[async_trait]
    impl Transport for Arc<SpyTransport> {
        async fn execute(&self, url: &str, credentials: &Credentials) -> Result<String> {
            self.as_ref().execute(url, credentials).await
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn execute(&self, _url: &str, _credentials: &Credentials) -> Result<String> {
            Err(BridgeError::Connection)
        }
    }

    /// Parser that counts how often it runs
    #[derive(Clone, Default)]
    struct CountingParser {
        calls: Arc<AtomicUsize>,
    }

    impl FeedParser for CountingParser {
        fn parse(&self, body: &str) -> Result<AtomDocument> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AtomFeedParser.parse(body)
        }
    }

    fn config() -> AdapterConfig {
        AdapterConfig::new("https://contoso.sharepoint.com/sites/ops", "svc-bridge", "hunter2")
    }

    fn adapter_with(
        body: impl Into<String>,
    ) -> SharepointAdapter<Arc<SpyTransport>, AtomFeedParser> {
        SharepointAdapter::with_parts(
            config(),
            Arc::new(SpyTransport::returning(body)),
            AtomFeedParser,
        )
    }

    fn three_lists() -> String {
        feed(&[
            &[("Title", "Documents"), ("Id", "1")],
            &[("Title", "Site Pages"), ("Id", "2")],
            &[("Title", "Tasks"), ("Id", "3")],
        ])
    }

    #[tokio::test]
    async fn test_invalid_structure_makes_no_network_call() {
        let transport = Arc::new(SpyTransport::returning(three_lists()));
        let parser = CountingParser::default();
        let adapter = SharepointAdapter::with_parts(config(), transport.clone(), parser.clone());

        for structure in ["Items", "lists", "", "Lists "] {
            let request = BridgeRequest::new(structure).with_fields(["Title"]);
            let expected = BridgeError::InvalidStructure(structure.to_string());

            assert_eq!(adapter.count(&request).await.unwrap_err(), expected);
            assert_eq!(adapter.retrieve(&request).await.unwrap_err(), expected);
            assert_eq!(adapter.search(&request).await.unwrap_err(), expected);
        }

        assert_eq!(transport.calls(), 0);
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_parse_error_makes_no_network_call() {
        let adapter = adapter_with(three_lists());
        let request = BridgeRequest::new("Lists")
            .with_query(r#"$filter=Title eq '<%= parameter["Title"] %>'"#);

        let err = adapter.count(&request).await.unwrap_err();
        assert!(matches!(err, BridgeError::QueryParse(_)));
        assert_eq!(adapter.transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_url_and_credentials() {
        let adapter = adapter_with(three_lists());
        let request = BridgeRequest::new("Lists")
            .with_query(r#"$filter=Title eq '<%= parameter["Title"] %>'&$top=1"#)
            .with_parameter("Title", "Team Tasks");

        adapter.count(&request).await.unwrap();

        assert_eq!(
            adapter.transport.last_url().as_deref(),
            Some("https://contoso.sharepoint.com/sites/ops/_api/web/lists?%24filter=Title%20eq%20%27Team%20Tasks%27&%24top=1")
        );
        assert_eq!(
            adapter.transport.authorizations.lock().unwrap().clone(),
            vec!["svc-bridge".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unfiltered_request() {
        let adapter = adapter_with(feed(&[]));
        adapter.count(&BridgeRequest::new("Lists")).await.unwrap();
        assert_eq!(
            adapter.transport.last_url().as_deref(),
            Some("https://contoso.sharepoint.com/sites/ops/_api/web/lists?")
        );
    }

    #[tokio::test]
    async fn test_count() {
        let request = BridgeRequest::new("Lists");
        assert_eq!(adapter_with(feed(&[])).count(&request).await.unwrap(), 0);
        assert_eq!(
            adapter_with(feed(&[&[("Title", "A")]]))
                .count(&request)
                .await
                .unwrap(),
            1
        );
        assert_eq!(adapter_with(three_lists()).count(&request).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_retrieve_no_match_is_empty() {
        let adapter = adapter_with(feed(&[]));
        let request = BridgeRequest::new("Lists").with_fields(["Title", "ID"]);
        let record = adapter.retrieve(&request).await.unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_single_match() {
        let adapter = adapter_with(feed(&[&[
            ("ID", "7"),
            ("Title", "Documents"),
            ("ItemCount", "12"),
        ]]));
        let request = BridgeRequest::new("Lists").with_fields(["Title", "ID"]);

        let record = adapter.retrieve(&request).await.unwrap();

        assert_eq!(record.field_names(), vec!["Title", "ID"]);
        assert_eq!(record.get("Title"), Some("Documents"));
        assert_eq!(record.get("ID"), Some("7"));
        assert_eq!(record.get("ItemCount"), None);
    }

    #[tokio::test]
    async fn test_retrieve_missing_field_is_none() {
        let adapter = adapter_with(feed(&[&[("Title", "Documents")]]));
        let request = BridgeRequest::new("Lists").with_fields(["Title", "Nope"]);

        let record = adapter.retrieve(&request).await.unwrap();
        assert_eq!(record.field_names(), vec!["Title", "Nope"]);
        assert_eq!(record.get("Nope"), None);
    }

    #[tokio::test]
    async fn test_retrieve_multiple_matches_is_ambiguous() {
        let adapter = adapter_with(three_lists());
        let request = BridgeRequest::new("Lists").with_fields(["Title"]);
        assert_eq!(
            adapter.retrieve(&request).await.unwrap_err(),
            BridgeError::AmbiguousResult { matches: 3 }
        );
    }

    #[tokio::test]
    async fn test_retrieve_without_fields_is_empty() {
        let adapter = adapter_with(feed(&[&[("Title", "Documents")]]));

        let record = adapter.retrieve(&BridgeRequest::new("Lists")).await.unwrap();
        assert!(record.is_empty());

        let no_fields = BridgeRequest::new("Lists").with_fields(Vec::<String>::new());
        assert!(adapter.retrieve(&no_fields).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search() {
        let adapter = adapter_with(three_lists());
        let request = BridgeRequest::new("Lists")
            .with_fields(["Title"])
            .with_metadata("pageSize", "25")
            .with_metadata("pageNumber", "2");

        let list = adapter.search(&request).await.unwrap();

        assert_eq!(list.fields, vec!["Title".to_string()]);
        assert_eq!(list.records.len(), 3);
        let titles: Vec<_> = list.records.iter().map(|r| r.get("Title")).collect();
        assert_eq!(titles, vec![Some("Documents"), Some("Site Pages"), Some("Tasks")]);
        for record in &list.records {
            assert_eq!(record.field_names(), vec!["Title"]);
        }
        assert_eq!(list.metadata, normalize_pagination_metadata(&request.metadata));
        assert_eq!(list.metadata.get("offset").map(String::as_str), Some("25"));
    }

    #[tokio::test]
    async fn test_search_without_fields() {
        let adapter = adapter_with(three_lists());
        let list = adapter.search(&BridgeRequest::new("Lists")).await.unwrap();
        assert!(list.fields.is_empty());
        assert_eq!(list.records.len(), 3);
        assert!(list.records.iter().all(Record::is_empty));
        assert_eq!(list.metadata, normalize_pagination_metadata(&Metadata::new()));
    }

    #[tokio::test]
    async fn test_search_field_lookup_modes() {
        let body = r#"<feed>
            <entry><d:Title>A</d:Title><d:Description>first</d:Description></entry>
            <entry><d:Title>B</d:Title></entry>
            <entry><d:Title>C</d:Title><d:Description>third</d:Description></entry>
        </feed>"#;
        let request = BridgeRequest::new("Lists").with_fields(["Title", "Description"]);

        let positional = adapter_with(body).search(&request).await.unwrap();
        let descriptions: Vec<_> = positional
            .records
            .iter()
            .map(|r| r.get("Description"))
            .collect();
        // Entry B lacks a Description, so positional lookup shifts C's value onto it
        assert_eq!(descriptions, vec![Some("first"), Some("third"), None]);

        let scoped = SharepointAdapter::with_parts(
            config().with_field_lookup(FieldLookup::EntryScoped),
            SpyTransport::returning(body),
            AtomFeedParser,
        )
        .search(&request)
        .await
        .unwrap();
        let descriptions: Vec<_> = scoped
            .records
            .iter()
            .map(|r| r.get("Description"))
            .collect();
        assert_eq!(descriptions, vec![Some("first"), None, Some("third")]);
    }

    #[tokio::test]
    async fn test_connection_error_propagates() {
        let adapter = SharepointAdapter::with_parts(config(), FailingTransport, AtomFeedParser);
        let request = BridgeRequest::new("Lists").with_fields(["Title"]);
        assert_eq!(adapter.count(&request).await.unwrap_err(), BridgeError::Connection);
        assert_eq!(adapter.retrieve(&request).await.unwrap_err(), BridgeError::Connection);
        assert_eq!(adapter.search(&request).await.unwrap_err(), BridgeError::Connection);
    }

    #[test]
    fn test_http_adapter_from_config() {
        let adapter = SharepointAdapter::new(
            AdapterConfig::new("http://127.0.0.1:1/sites/ops/", "svc-bridge", "hunter2")
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        assert_eq!(adapter.config().timeout, Duration::from_secs(2));
        assert_eq!(adapter.config().field_lookup, FieldLookup::Positional);
        assert_eq!(adapter.name(), ADAPTER_NAME);
        assert_eq!(adapter.version(), ADAPTER_VERSION);

        let result = tokio_test::block_on(adapter.count(&BridgeRequest::new("Lists")));
        assert_eq!(result.unwrap_err(), BridgeError::Connection);
    }

    #[tokio::test]
    async fn test_html_sign_in_page_is_xml_error() {
        let adapter = adapter_with(
            "<!DOCTYPE html><html><body class=signin><form></form></body></html>",
        );
        let request = BridgeRequest::new("Lists").with_fields(["Title"]);
        assert!(matches!(
            adapter.count(&request).await.unwrap_err(),
            BridgeError::XmlParse { .. }
        ));
        assert!(matches!(
            adapter.retrieve(&request).await.unwrap_err(),
            BridgeError::XmlParse { .. }
        ));
        assert!(matches!(
            adapter.search(&request).await.unwrap_err(),
            BridgeError::XmlParse { .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_response_is_xml_error() {
        let adapter = adapter_with("<html><body>Sign in</body>");
        let request = BridgeRequest::new("Lists").with_fields(["Title"]);
        assert!(matches!(
            adapter.search(&request).await.unwrap_err(),
            BridgeError::XmlParse { .. }
        ));
    }

    /// Transport that answers with a feed derived from the filter in the URL
    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn execute(&self, url: &str, _credentials: &Credentials) -> Result<String> {
            let tag = url.rsplit("tag%20eq%20").next().unwrap_or_default().to_string();
            tokio::task::yield_now().await;
            let titles: Vec<String> = (0..5).map(|i| format!("{tag}-{i}")).collect();
            let entries: Vec<Vec<(&str, &str)>> =
                titles.iter().map(|t| vec![("Title", t.as_str())]).collect();
            let slices: Vec<&[(&str, &str)]> = entries.iter().map(Vec::as_slice).collect();
            Ok(feed(&slices))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_searches_do_not_interleave() {
        let adapter = Arc::new(SharepointAdapter::with_parts(
            config(),
            EchoTransport,
            AtomFeedParser,
        ));

        let handles: Vec<_> = (0..32)
            .map(|n| {
                let adapter = Arc::clone(&adapter);
                tokio::spawn(async move {
                    let request = BridgeRequest::new("Lists")
                        .with_query(r#"$filter=tag eq <%= parameter["Tag"] %>"#)
                        .with_parameter("Tag", format!("q{n}"))
                        .with_fields(["Title"]);
                    (n, adapter.search(&request).await)
                })
            })
            .collect();

        for handle in handles {
            let (n, result) = handle.await.unwrap();
            let list = result.unwrap();
            let titles: Vec<_> = list.records.iter().filter_map(|r| r.get("Title")).collect();
            let expected: Vec<String> = (0..5).map(|i| format!("q{n}-{i}")).collect();
            assert_eq!(titles, expected);
        }
    }
}
