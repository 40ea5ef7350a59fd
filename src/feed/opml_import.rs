use opml::{Outline, OPML};

use crate::error::Result;

/// Every `xmlUrl` in the document, nested folders included, in document order.
pub fn feed_urls_from_opml(xml: &str) -> Result<Vec<String>> {
    let document = OPML::from_str(xml)?;
    let mut urls = Vec::new();
    collect_urls(&document.body.outlines, &mut urls);
    Ok(urls)
}

fn collect_urls(outlines: &[Outline], urls: &mut Vec<String>) {
    for outline in outlines {
        if let Some(url) = outline.xml_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                urls.push(url.to_string());
            }
        }
        collect_urls(&outline.outlines, urls);
    }
}
