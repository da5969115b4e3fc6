use crate::handlers::{download_buttons, repo_cards};
use crate::state::AppState;

pub fn render_index(state: &AppState) -> String {
    let cards: String = state
        .stats
        .targets()
        .iter()
        .zip(repo_cards(state))
        .map(|(target, card)| {
            format!(
                r#"      <article class="repo">
        <h2>{name}</h2>
        <p class="repo-id">{repo}</p>
        <div class="counts">
          <div class="stat"><span class="label">Stars</span><span id="{stars_id}" class="value">{stars}</span></div>
          <div class="stat"><span class="label">Forks</span><span id="{forks_id}" class="value">{forks}</span></div>
        </div>
      </article>
"#,
                name = escape_html(&card.name),
                repo = escape_html(&card.repo_id),
                stars_id = escape_html(&target.stars_sink),
                forks_id = escape_html(&target.forks_sink),
                stars = escape_html(&card.stars),
                forks = escape_html(&card.forks),
            )
        })
        .collect();

    let buttons: String = state
        .downloads
        .targets()
        .iter()
        .zip(download_buttons(state))
        .map(|(target, button)| {
            format!(
                r#"      <a id="{id}" class="download" href="{href}" data-track="1" target="_blank" rel="noopener noreferrer">{label}</a>
"#,
                id = escape_html(&target.link_sink),
                href = escape_html(&button.track_url),
                label = escape_html(&button.label),
            )
        })
        .collect();

    INDEX_HTML
        .replace("{{REPO_CARDS}}", &cards)
        .replace("{{DOWNLOADS}}", &buttons)
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>WhatsApp Bots</title>
  <style>
    :root {
      --bg-1: #0f172a;
      --bg-2: #1e293b;
      --ink: #e2e8f0;
      --muted: #94a3b8;
      --accent: #25d366;
      --card: rgba(30, 41, 59, 0.86);
      --shadow: 0 24px 60px rgba(0, 0, 0, 0.35);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(135deg, var(--bg-1), var(--bg-2));
      color: var(--ink);
      font-family: "Segoe UI", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(960px, 100%);
      display: grid;
      gap: 28px;
    }

    h1 {
      margin: 0;
      font-size: clamp(2rem, 4vw, 2.8rem);
    }

    .repos {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(240px, 1fr));
      gap: 16px;
    }

    .repo {
      background: var(--card);
      border-radius: 20px;
      padding: 20px;
      box-shadow: var(--shadow);
    }

    .repo h2 {
      margin: 0;
    }

    .repo-id {
      margin: 4px 0 16px;
      color: var(--muted);
      font-size: 0.9rem;
    }

    .counts {
      display: grid;
      grid-template-columns: 1fr 1fr;
      gap: 12px;
    }

    .stat .label {
      display: block;
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: var(--muted);
    }

    .stat .value {
      font-size: 1.6rem;
      font-weight: 600;
    }

    .downloads {
      display: flex;
      flex-wrap: wrap;
      gap: 12px;
    }

    .download {
      padding: 14px 20px;
      border-radius: 999px;
      background: var(--accent);
      color: #0b1320;
      font-weight: 600;
      text-decoration: none;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>WhatsApp Bots</h1>
    </header>

    <section class="repos">
{{REPO_CARDS}}    </section>

    <section class="downloads">
{{DOWNLOADS}}    </section>
  </main>

  <script>
    let polls = 0;

    const applySinks = (sinks) => {
      for (const [id, element] of Object.entries(sinks)) {
        const node = document.getElementById(id);
        if (!node) {
          continue;
        }
        node.textContent = element.text;
        if (element.href && !node.dataset.track) {
          node.href = element.href;
        }
      }
    };

    const poll = async () => {
      try {
        const response = await fetch('/api/sinks');
        if (response.ok) {
          applySinks(await response.json());
        }
      } catch (err) {
        console.error('failed to load sinks', err);
      }
      polls += 1;
      setTimeout(poll, polls < 12 ? 250 : 10000);
    };

    poll();
  </script>
</body>
</html>
"#;
