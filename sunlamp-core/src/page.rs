// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp-core - Status page rendering
//!
//! Builds the single HTML control page served at `/`.  The page shows the
//! current lamp level and one button for the opposite action.  Output is
//! assembled in a fixed 1024 byte buffer with truncating appends.

use crate::lamp::Level;

/// Size of the rendered page buffer in bytes.
pub const PAGE_BUF_SIZE: usize = 1024;

/// Rendered status page, bounded at [`PAGE_BUF_SIZE`].
pub type Page = heapless::String<PAGE_BUF_SIZE>;

const PAGE_HEAD: &str = concat!(
    "<!DOCTYPE html><html><head>",
    "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
    "<link rel=\"icon\" href=\"data:,\">",
    "<style>html { font-family: Helvetica; display: inline-block; ",
    "margin: 0px auto; text-align: center;}",
    ".button { background-color: #4CAF50; border: none; color: white; ",
    "padding: 16px 40px; text-decoration: none; font-size: 30px; ",
    "margin: 2px; cursor: pointer;}",
    ".button2 { background-color: #555555; }</style></head>",
    "<body><h1>Sunlamp Web Server</h1>",
    "<p>White LED - State ",
);

const BUTTON_TURN_ON: &str =
    "<p><a href=\"/white/on\"><button class=\"button\">ON</button></a></p>";
const BUTTON_TURN_OFF: &str =
    "<p><a href=\"/white/off\"><button class=\"button button2\">OFF</button></a></p>";

const PAGE_TAIL: &str = "</body></html>";

/// Renders the status page for the given lamp level.
///
/// The returned page names the current level and offers exactly one
/// button, linking to the route that toggles it.
pub fn render_status(level: Level) -> Page {
    let mut page = Page::new();
    append_bounded(&mut page, PAGE_HEAD);
    append_bounded(&mut page, level.label());
    append_bounded(&mut page, "</p>");
    match level {
        Level::Off => append_bounded(&mut page, BUTTON_TURN_ON),
        Level::On => append_bounded(&mut page, BUTTON_TURN_OFF),
    }
    append_bounded(&mut page, PAGE_TAIL);
    page
}

// Appends as much of `text` as fits, dropping the rest.
fn append_bounded<const N: usize>(buf: &mut heapless::String<N>, text: &str) {
    for ch in text.chars() {
        if buf.push(ch).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_page_offers_the_on_route() {
        let page = render_status(Level::Off);
        assert!(page.contains("White LED - State off</p>"));
        assert!(page.contains("href=\"/white/on\""));
        assert!(page.contains("class=\"button\""));
        assert!(!page.contains("class=\"button button2\""));
    }

    #[test]
    fn on_page_offers_the_off_route() {
        let page = render_status(Level::On);
        assert!(page.contains("White LED - State on</p>"));
        assert!(page.contains("href=\"/white/off\""));
        assert!(page.contains("class=\"button button2\""));
        assert!(!page.contains("href=\"/white/on\""));
    }

    #[test]
    fn page_fits_the_buffer_with_room_to_spare() {
        for level in [Level::Off, Level::On] {
            let page = render_status(level);
            assert!(page.len() <= PAGE_BUF_SIZE);
            assert!(page.ends_with(PAGE_TAIL));
        }
    }

    #[test]
    fn append_stops_at_capacity() {
        let mut buf: heapless::String<8> = heapless::String::new();
        append_bounded(&mut buf, "0123456789");
        assert_eq!(buf.as_str(), "01234567");
        append_bounded(&mut buf, "x");
        assert_eq!(buf.as_str(), "01234567");
    }
}
