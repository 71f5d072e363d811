//! Headlines from Google News RSS.

use serde::Deserialize;

use crate::chatbot::lookup::{LookupError, NewsScope};

pub const HEADLINE_LIMIT: usize = 3;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub title: String,
    pub link: String,
}

pub fn feed_url(scope: NewsScope) -> String {
    match scope {
        NewsScope::Domestic => "https://news.google.com/rss?hl=th&gl=TH&ceid=TH:th".to_string(),
        NewsScope::Global => format!(
            "https://news.google.com/rss/search?q={}&hl=th&gl=TH&ceid=TH:th",
            urlencoding::encode("ข่าวต่างประเทศ")
        ),
    }
}

/// First `limit` items that carry a title.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<Headline>, LookupError> {
    let rss: Rss = quick_xml::de::from_str(xml).map_err(|e| LookupError::Parse(e.to_string()))?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let title = item.title.trim().to_string();
            let link = item.link.trim().to_string();
            (!title.is_empty()).then_some(Headline { title, link })
        })
        .take(limit)
        .collect())
}

pub fn format_news(scope: NewsScope, xml: &str) -> Result<String, LookupError> {
    let headlines = parse_feed(xml, HEADLINE_LIMIT)?;
    if headlines.is_empty() {
        return Err(LookupError::NotFound);
    }

    let (header, bullet) = match scope {
        NewsScope::Domestic => ("🗞️ ข่าวเด่นประจำวัน:", "📰"),
        NewsScope::Global => ("🌐 ข่าวต่างประเทศเด่นวันนี้:", "🌍"),
    };
    let blocks: Vec<String> = headlines
        .iter()
        .map(|h| {
            if h.link.is_empty() {
                format!("{bullet} {}", h.title)
            } else {
                format!("{bullet} {}\n🔗 [อ่านต่อ](<{}>)", h.title, h.link)
            }
        })
        .collect();
    Ok(format!("{header}\n\n{}", blocks.join("\n\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>Google News</title>
<item><title>ฝนถล่มกรุงเทพ &amp; ปริมณฑล - ไทยรัฐ</title><link>https://news.google.com/a</link><description>&lt;a href="x"&gt;</description></item>
<item><title><![CDATA[ราคาทองพุ่ง]]></title><link>https://news.google.com/b</link></item>
<item><title>ไม่มีลิงก์</title></item>
<item><title>ข่าวที่สี่</title><link>https://news.google.com/d</link></item>
</channel></rss>"#;

    #[test]
    fn test_parse_feed_skips_channel_title() {
        let headlines = parse_feed(FEED, 3).unwrap();
        assert_eq!(headlines.len(), 3);
        assert_eq!(headlines[0].title, "ฝนถล่มกรุงเทพ & ปริมณฑล - ไทยรัฐ");
        assert_eq!(headlines[1].title, "ราคาทองพุ่ง");
        assert_eq!(headlines[2].link, "");
    }

    #[test]
    fn test_format_news() {
        let text = format_news(NewsScope::Global, FEED).unwrap();
        assert!(text.starts_with("🌐 ข่าวต่างประเทศเด่นวันนี้:\n\n🌍 ฝนถล่มกรุงเทพ"));
        assert!(text.contains("🔗 [อ่านต่อ](<https://news.google.com/b>)"));
        assert!(text.ends_with("🌍 ไม่มีลิงก์"));
        assert!(!text.contains("ข่าวที่สี่"));
    }

    #[test]
    fn test_empty_feed() {
        let xml = "<rss><channel><title>x</title></channel></rss>";
        assert!(matches!(format_news(NewsScope::Domestic, xml), Err(LookupError::NotFound)));
    }

    #[test]
    fn test_numeric_entities_in_titles() {
        let xml = r#"<rss><channel>
<item><title>Apple&#8217;s &#x201C;AI&#x201D; push</title><link>https://news.google.com/e</link></item>
</channel></rss>"#;
        let headlines = parse_feed(xml, 3).unwrap();
        assert_eq!(headlines[0].title, "Apple\u{2019}s \u{201C}AI\u{201D} push");
        assert_eq!(headlines[0].link, "https://news.google.com/e");
    }

    #[test]
    fn test_malformed_feed_is_parse_error() {
        let xml = "<rss><channel><item><title>ข่าว</item></channel>";
        assert!(matches!(format_news(NewsScope::Domestic, xml), Err(LookupError::Parse(_))));
    }

    #[test]
    fn test_global_feed_url_is_encoded() {
        assert!(feed_url(NewsScope::Global).contains("q=%E0%B8%82"));
        assert!(!feed_url(NewsScope::Domestic).contains("search"));
    }
}
