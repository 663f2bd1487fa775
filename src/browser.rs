const SPOTIFY_SEARCH: &str = "https://open.spotify.com/search/";

/// Spotify web search for `query`, percent encoded.
pub fn spotify_search_url(query: &str) -> String {
    format!("{SPOTIFY_SEARCH}{}", urlencoding::encode(query))
}

pub trait BrowserLauncher {
    fn open(&mut self, url: &str) -> anyhow::Result<()>;
}

/// Opens URLs in the desktop's default browser.
#[derive(Debug, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&mut self, url: &str) -> anyhow::Result<()> {
        open::that(url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_spaces() {
        assert_eq!(
            spotify_search_url("Bohemian Rhapsody by Queen"),
            "https://open.spotify.com/search/Bohemian%20Rhapsody%20by%20Queen"
        );
    }

    #[test]
    fn encodes_reserved_characters() {
        assert_eq!(
            spotify_search_url("Rock & Roll by Led Zeppelin"),
            "https://open.spotify.com/search/Rock%20%26%20Roll%20by%20Led%20Zeppelin"
        );
    }
}
