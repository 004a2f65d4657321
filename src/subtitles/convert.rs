use regex::Regex;
use std::sync::LazyLock;

/// `[hh:]mm:ss.mmm`
static VTT_TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:([0-9]+):)?([0-9]{2}):([0-9]{2})[.,]([0-9]{3})$").unwrap());

/// Cue markup such as `<c.colorE5E5E5>`, `</c>`, `<00:00:01.000>` or `<i>`
static CUE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

fn srt_timestamp(vtt: &str) -> String {
    let Some(captures) = VTT_TIMESTAMP_RE.captures(vtt) else {
        return vtt.replace('.', ",");
    };

    let hours: u64 = captures
        .get(1)
        .and_then(|h| h.as_str().parse().ok())
        .unwrap_or(0);

    format!("{:02}:{}:{},{}", hours, &captures[2], &captures[3], &captures[4])
}

fn clean_cue_text(line: &str) -> String {
    CUE_TAG_RE
        .replace_all(line, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Converts WebVTT subtitles to SRT
///
/// Header, `NOTE`, `STYLE` and `REGION` blocks are dropped along with cue
/// identifiers and cue settings. Timestamps get a `,` millisecond separator and
/// an explicit hour field. Markup is stripped from the text and cues left
/// without text are dropped. Remaining cues are numbered from 1.
pub fn vtt_to_srt(vtt: &str) -> String {
    let normalized = vtt.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut srt = String::new();
    let mut counter = 0;

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().map(str::trim).skip_while(|l| !l.contains("-->"));

        let Some(timing) = lines.next() else {
            continue;
        };

        let Some((start, rest)) = timing.split_once("-->") else {
            continue;
        };
        let start = start.trim();
        let end = rest.split_whitespace().next().unwrap_or_default();

        let text: Vec<String> = lines
            .map(clean_cue_text)
            .filter(|line| !line.is_empty())
            .collect();

        if text.is_empty() {
            continue;
        }

        counter += 1;
        srt.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            counter,
            srt_timestamp(start),
            srt_timestamp(end),
            text.join("\n")
        ));
    }

    srt
}
