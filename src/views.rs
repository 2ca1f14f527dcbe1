//! HTML pages served to the browser.
//!
//! Pages are small enough to be assembled with `format!`; every interpolated
//! value goes through [`escape`].

use std::fmt::Write;

use crate::{dto::game::GameView, state::game::Digit};

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        body
    )
}

/// Start page with the login state and the "new game" form.
pub fn home(open_id: Option<&str>) -> String {
    let mut body = String::from("<h1>Pick a number</h1>\n");
    match open_id {
        Some(id) => {
            let _ = writeln!(
                body,
                "<p>Logged in as <strong>{}</strong>.</p>\n\
                 <form method=\"post\" action=\"/logout/\"><button type=\"submit\">Log out</button></form>",
                escape(id)
            );
        }
        None => body.push_str("<p><a href=\"/login/\">Log in with OpenID</a></p>\n"),
    }
    body.push_str(
        "<form method=\"post\" action=\"/game/\"><button type=\"submit\">New game</button></form>\n",
    );
    page("Pick a number", &body)
}

/// Page for a game still in progress: previous guesses plus the guess form.
pub fn game_round(game: &GameView) -> String {
    let mut body = String::from("<h1>Guess a number between 0 and 9</h1>\n");

    if let Some(last) = game.current_guess {
        let _ = writeln!(body, "<p>{last} is not it. Try again.</p>");
    }
    if !game.guesses.is_empty() {
        body.push_str("<ol>\n");
        for guess in &game.guesses {
            let _ = writeln!(body, "<li>{guess}</li>");
        }
        body.push_str("</ol>\n");
    }

    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"/game/{id}/guess/\">\n\
         <input name=\"guess\" type=\"number\" min=\"0\" max=\"{max}\" required autofocus>\n\
         <button type=\"submit\">Guess</button>\n</form>",
        id = escape(&game.id),
        max = Digit::MAX
    );
    page("Pick a number", &body)
}

/// Page for a won game.
pub fn game_won(game: &GameView) -> String {
    let noun = if game.guesses_count == 1 {
        "guess"
    } else {
        "guesses"
    };
    let body = format!(
        "<h1>You won!</h1>\n<p>You found the number in {} {noun}.</p>\n\
         <form method=\"post\" action=\"/game/\"><button type=\"submit\">Play again</button></form>\n",
        game.guesses_count
    );
    page("You won", &body)
}

/// OpenID login form.
pub fn login() -> String {
    let body = "<h1>Log in</h1>\n\
        <form method=\"post\" action=\"/login/\">\n\
        <label>OpenID <input name=\"openIdIdentifier\" type=\"text\" required autofocus></label>\n\
        <button type=\"submit\">Log in</button>\n</form>\n";
    page("Log in", body)
}

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::GameState;

    fn view(guesses: Vec<u8>, state: GameState) -> GameView {
        GameView {
            id: "0b7e4b36-5d1e-4f8e-9c44-3c3d2f0e9a11".into(),
            current_guess: guesses.last().copied(),
            guesses_count: guesses.len(),
            guesses,
            state,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn home_shows_identity_escaped() {
        let html = home(Some("https://evil.example/<script>"));
        assert!(html.contains("https://evil.example/&lt;script&gt;"));
        assert!(html.contains("action=\"/logout/\""));
        assert!(home(None).contains("href=\"/login/\""));
    }

    #[test]
    fn round_lists_guesses_and_posts_to_game() {
        let html = game_round(&view(vec![3, 5], GameState::InProgress));
        assert!(html.contains("<li>3</li>\n<li>5</li>"));
        assert!(html.contains("5 is not it"));
        assert!(html.contains("action=\"/game/0b7e4b36-5d1e-4f8e-9c44-3c3d2f0e9a11/guess/\""));
    }

    #[test]
    fn won_page_counts_guesses() {
        assert!(game_won(&view(vec![3, 5, 7], GameState::Won)).contains("in 3 guesses"));
        assert!(game_won(&view(vec![7], GameState::Won)).contains("in 1 guess."));
    }
}
