//! Atom feed bodies shaped like SharePoint's `_api/web/lists` responses

/// Build a feed with one `entry` per slice of `(field, raw text)` pairs.
/// Text is inserted as-is, so callers escape it themselves.
pub fn feed(entries: &[&[(&str, &str)]]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xml:base="https://contoso.sharepoint.com/_api/" xmlns="http://www.w3.org/2005/Atom" xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices" xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
  <id>https://contoso.sharepoint.com/_api/web/lists</id>
  <title />
  <updated>2024-05-02T10:15:00Z</updated>
"#,
    );

    for (i, fields) in entries.iter().enumerate() {
        xml.push_str(&format!(
            r#"  <entry m:etag="&quot;{i}&quot;">
    <id>https://contoso.sharepoint.com/_api/Web/Lists(guid'{i}')</id>
    <category term="SP.List" scheme="http://schemas.microsoft.com/ado/2007/08/dataservices/scheme" />
    <title />
    <content type="application/xml">
      <m:properties>
"#
        ));
        for (name, value) in fields.iter() {
            xml.push_str(&format!("        <d:{name}>{value}</d:{name}>\n"));
        }
        xml.push_str("      </m:properties>\n    </content>\n  </entry>\n");
    }

    xml.push_str("</feed>\n");
    xml
}
