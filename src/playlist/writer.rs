//! Rendering of filtered playlists and their output filenames

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::models::{Channel, ExpiryInfo, OutputFormat};
use crate::utils::url::UrlUtils;

/// Prefix of every generated filename
pub const FILENAME_PREFIX: &str = "bitis";

/// Render channels in the requested format
///
/// M3U and M3U8 share the same extended layout; TXT is one URL per line.
pub fn render(channels: &[Arc<Channel>], format: OutputFormat) -> String {
    match format {
        OutputFormat::M3u | OutputFormat::M3u8 => render_m3u(channels),
        OutputFormat::Txt => channels.iter().fold(String::new(), |mut out, c| {
            out.push_str(&c.url);
            out.push('\n');
            out
        }),
    }
}

fn render_m3u(channels: &[Arc<Channel>]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for channel in channels {
        out.push_str("#EXTINF:-1");
        if let Some(id) = &channel.tvg_id {
            let _ = write!(out, " tvg-id=\"{id}\"");
        }
        if let Some(name) = &channel.tvg_name {
            let _ = write!(out, " tvg-name=\"{name}\"");
        }
        if let Some(logo) = &channel.logo {
            let _ = write!(out, " tvg-logo=\"{logo}\"");
        }
        if !channel.group.is_empty() {
            let _ = write!(out, " group-title=\"{}\"", channel.group);
        }
        let _ = writeln!(out, ",{}", channel.name);
        out.push_str(&channel.url);
        out.push('\n');
    }
    out
}

/// Filename `bitis<DDMMYYYY>_<shortDomain><ext>`
///
/// The date is the expiry when known and still in the future, otherwise `today`.
pub fn output_filename(
    expiry: &ExpiryInfo,
    source_url: &str,
    format: OutputFormat,
    today: NaiveDate,
) -> String {
    format!(
        "{}{}_{}{}",
        FILENAME_PREFIX,
        expiry.filename_stamp(today),
        UrlUtils::short_domain(source_url),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::parser::parse;
    use chrono::{TimeZone, Utc};

    fn channel(name: &str, group: &str, url: &str) -> Arc<Channel> {
        Arc::new(Channel {
            name: name.to_string(),
            group: group.to_string(),
            logo: Some("http://logo/a.png".to_string()),
            tvg_id: Some("a.id".to_string()),
            tvg_name: None,
            url: url.to_string(),
        })
    }

    #[test]
    fn test_render_m3u_layout() {
        let out = render(&[channel("A", "TR", "http://x/1")], OutputFormat::M3u);
        assert_eq!(
            out,
            "#EXTM3U\n#EXTINF:-1 tvg-id=\"a.id\" tvg-logo=\"http://logo/a.png\" group-title=\"TR\",A\nhttp://x/1\n"
        );
    }

    #[test]
    fn test_render_txt_is_urls_only() {
        let out = render(
            &[channel("A", "TR", "http://x/1"), channel("B", "DE", "http://x/2")],
            OutputFormat::Txt,
        );
        assert_eq!(out, "http://x/1\nhttp://x/2\n");
    }

    #[test]
    fn test_rendered_playlist_parses_back() {
        let channels = vec![channel("A", "TR", "http://x/1"), channel("B", "DE", "http://x/2")];
        let parsed = parse(&render(&channels, OutputFormat::M3u8), "http://x");
        assert_eq!(parsed.channel_count(), 2);
        for (original, reparsed) in channels.iter().zip(&parsed.channels) {
            assert_eq!(original.as_ref(), reparsed.as_ref());
        }
    }

    #[test]
    fn test_output_filename() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap();
        let future = ExpiryInfo::at(Utc.with_ymd_and_hms(2027, 1, 15, 0, 0, 0).unwrap(), now);

        assert_eq!(
            output_filename(&future, "http://www.tv.example.com/get.php", OutputFormat::M3u, today),
            "bitis15012027_example.com.m3u"
        );
        assert_eq!(
            output_filename(&ExpiryInfo::Unknown, "garbage", OutputFormat::Txt, today),
            "bitis16102026_unknown.txt"
        );
    }
}
