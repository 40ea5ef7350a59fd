//! Feed documents shared by tests.

pub const RSS_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example</title>
    <link>https://example.com</link>
    <description>Example feed</description>
    <item>
      <title>First post</title>
      <link>https://example.com/first</link>
      <description>&lt;p&gt;Hello world, this is the first post.&lt;/p&gt;</description>
      <dc:creator>Alice</dc:creator>
      <pubDate>Mon, 05 Oct 2026 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Second post</title>
      <link>https://example.com/second</link>
      <description>Another entry with enough words.</description>
      <pubDate>Sun, 04 Oct 2026 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

/// `{base}` is replaced with the mock server URI.
pub const OPML_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <head><title>Subscriptions</title></head>
  <body>
    <outline text="Radio">
      <outline text="Example" type="rss" xmlUrl="{base}/feed.xml"/>
      <outline text="Broken" type="rss" xmlUrl="{base}/missing.xml"/>
    </outline>
    <outline text="Top level" type="rss" xmlUrl="{base}/other.xml"/>
    <outline text="Folder without feed"/>
  </body>
</opml>"#;
