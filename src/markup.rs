//! HTML generation for the chat canvas

use crate::script::Message;
use crate::{CANVAS_HEIGHT, CANVAS_WIDTH};

/// Background of right-hand (`R) `) bubbles
pub const ME_COLOR: &str = "#a439ff";

/// Background of left-hand (`L) `) bubbles
pub const OTHER_COLOR: &str = "#2b2b2f";

// Placeholders are substituted with `str::replace` so CSS braces need no escaping.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
body {
  margin: 0;
  background: black;
  display: flex;
  justify-content: center;
  align-items: center;
}
.chat {
  width: {{WIDTH}}px;
  height: {{HEIGHT}}px;
  background: black;
  font-family: Arial, sans-serif;
  color: white;
  position: relative;
  overflow: hidden;
}
.bubble {
  position: absolute;
  max-width: 45%;
  padding: 16px 24px;
  font-size: 26px;
  border-radius: 30px;
}
.me {
  background: {{ME_COLOR}};
  right: 40px;
}
.them {
  background: {{OTHER_COLOR}};
  left: 40px;
}
</style>
</head>
<body>
<div class="chat">
{{BUBBLES}}
</div>
</body>
</html>
"#;

/// Build the full HTML document for a conversation.
///
/// Each message becomes one absolutely positioned bubble; message text is
/// escaped so it can never alter the document structure.
pub fn build_html(messages: &[Message]) -> String {
    let bubbles = messages
        .iter()
        .map(bubble_html)
        .collect::<Vec<_>>()
        .join("\n");

    PAGE_TEMPLATE
        .replace("{{WIDTH}}", &CANVAS_WIDTH.to_string())
        .replace("{{HEIGHT}}", &CANVAS_HEIGHT.to_string())
        .replace("{{ME_COLOR}}", ME_COLOR)
        .replace("{{OTHER_COLOR}}", OTHER_COLOR)
        .replace("{{BUBBLES}}", &bubbles)
}

fn bubble_html(msg: &Message) -> String {
    format!(
        r#"<div class="bubble {}" style="top:{}px">{}</div>"#,
        msg.side.css_class(),
        msg.top,
        escape_html(&msg.text)
    )
}

/// Escape the characters that are significant in HTML text and attributes
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
