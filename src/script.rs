//! Chat script parsing.
//!
//! A script is plain text with one message per line. Lines starting with
//! `R) ` are sent by the owner of the phone (right-hand bubbles), lines
//! starting with `L) ` come from the other party (left-hand bubbles).
//! Everything else is ignored.

/// Vertical position of the first bubble, in CSS pixels
pub const FIRST_OFFSET: u32 = 50;

/// Distance between the tops of consecutive bubbles, in CSS pixels
pub const BUBBLE_STEP: u32 = 90;

const ME_PREFIX: &str = "R) ";
const OTHER_PREFIX: &str = "L) ";

/// Every character that ends a line: `\n`, `\r`, form and group separators
/// and the Unicode line/paragraph separators
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Which participant sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Right-aligned accent bubble (`R) ` lines)
    Me,
    /// Left-aligned gray bubble (`L) ` lines)
    Other,
}

impl Side {
    /// CSS class selecting color and alignment for this side
    pub fn css_class(self) -> &'static str {
        match self {
            Side::Me => "me",
            Side::Other => "them",
        }
    }
}

/// A single chat bubble, positioned on the canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub side: Side,
    pub text: String,
    /// Distance from the top of the canvas
    pub top: u32,
}

/// Parse a script into messages in script order.
///
/// Never fails: unrecognized lines are dropped and do not advance the
/// vertical offset. An empty script yields no messages.
pub fn parse_script(text: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut top = FIRST_OFFSET;

    // `\r\n` leaves an empty piece between the two breaks; it is dropped below
    for line in text.split(LINE_BREAKS) {
        let line = line.trim();
        let (side, rest) = if let Some(rest) = line.strip_prefix(ME_PREFIX) {
            (Side::Me, rest)
        } else if let Some(rest) = line.strip_prefix(OTHER_PREFIX) {
            (Side::Other, rest)
        } else {
            continue;
        };

        messages.push(Message { side, text: rest.to_string(), top });
        top = next_offset(top);
    }

    messages
}

/// Offset of the bubble after one at `top`; pins at `u32::MAX` instead of wrapping
fn next_offset(top: u32) -> u32 {
    top.saturating_add(BUBBLE_STEP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_script_order() {
        let msgs = parse_script("R) hey\nL) hi there\nR) what's up");
        assert_eq!(msgs.len(), 3);
        let tops: Vec<u32> = msgs.iter().map(|m| m.top).collect();
        assert_eq!(tops, vec![50, 140, 230]);
        assert_eq!(msgs[0].side, Side::Me);
        assert_eq!(msgs[1].side, Side::Other);
        assert_eq!(msgs[1].text, "hi there");
        assert_eq!(msgs[2].text, "what's up");
    }

    #[test]
    fn unrecognized_lines_do_not_shift_offsets() {
        let msgs = parse_script("title\n\nR) a\n# note\nX) nope\nL) b\nR)missing space\n");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].top, 50);
        assert_eq!(msgs[1].top, 140);
        assert_eq!(msgs[1].side, Side::Other);
    }

    #[test]
    fn empty_script_yields_nothing() {
        assert!(parse_script("").is_empty());
        assert!(parse_script("\n\n   \n").is_empty());
    }

    #[test]
    fn lines_are_trimmed() {
        let msgs = parse_script("   R) padded   \r\nL) windows\r\n");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].text, "padded");
        assert_eq!(msgs[1].text, "windows");
    }

    #[test]
    fn carriage_return_separates_lines() {
        let msgs = parse_script("R) a\rL) b\rR) c");
        assert_eq!(msgs.len(), 3);
        let tops: Vec<u32> = msgs.iter().map(|m| m.top).collect();
        assert_eq!(tops, vec![50, 140, 230]);
        assert_eq!(msgs[0].text, "a");
        assert_eq!(msgs[1].side, Side::Other);
    }

    #[test]
    fn unicode_and_control_breaks_separate_lines() {
        let msgs = parse_script("R) a\u{2028}L) b\u{85}R) c\x0cL) d\x1eR) e\r\n\r\nL) f");
        let texts: Vec<&str> = msgs.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(msgs[5].top, FIRST_OFFSET + 5 * BUBBLE_STEP);
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        assert_eq!(next_offset(FIRST_OFFSET), 140);
        assert_eq!(next_offset(u32::MAX - 10), u32::MAX);
        assert_eq!(next_offset(u32::MAX), u32::MAX);
    }

    #[test]
    fn bare_prefix_is_dropped() {
        // trimming removes the separator space, so there is no prefix match
        assert!(parse_script("R) \nL) ").is_empty());
    }

    #[test]
    fn offsets_are_unbounded() {
        let script = "R) x\n".repeat(20);
        let msgs = parse_script(&script);
        assert_eq!(msgs.last().map(|m| m.top), Some(FIRST_OFFSET + 19 * BUBBLE_STEP));
    }

    #[test]
    fn css_classes() {
        assert_eq!(Side::Me.css_class(), "me");
        assert_eq!(Side::Other.css_class(), "them");
    }
}
