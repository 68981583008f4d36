//! End-to-end smoke run against a live poll server:
//! signup, login, create a poll, list it, vote on it and read the vote back.

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use poll_protocol::{
    Credentials, HasVotedResponse, LoginResponse, MessageResponse, Poll, Vote, CSRF_COOKIE,
    CSRF_HEADER, SESSION_COOKIE,
};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone)]
struct SmokeConfig {
    http_base: String,
    username: String,
    password: String,
    timeout_ms: u64,
    skip_signup: bool,
    skip_vote: bool,
}

/// What `/login` handed back, replayed on every authenticated call.
#[derive(Debug, Default)]
struct Session {
    session_cookie: Option<String>,
    bearer: Option<String>,
    csrf: String,
}

impl Session {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        let mut cookies = format!("{}={}", CSRF_COOKIE, self.csrf);
        if let Some(token) = &self.session_cookie {
            cookies.push_str(&format!("; {}={}", SESSION_COOKIE, token));
        }

        let request = request
            .header(header::COOKIE, cookies)
            .header(CSRF_HEADER, &self.csrf);
        match &self.bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = parse_args()?;

    println!("[smoke-client] HTTP base: {}", cfg.http_base);

    // Cookies are replayed by hand: the server marks them Secure, which a
    // cookie jar would refuse to send over plain http.
    let client = Client::builder()
        .timeout(Duration::from_millis(cfg.timeout_ms))
        .build()
        .context("failed to build HTTP client")?;

    let health: MessageResponse = expect_ok(client.get(url(&cfg, "/")).send().await, "/").await?;
    println!("[smoke-client] health: {}", health.message);

    let credentials = Credentials::new(cfg.username.clone(), cfg.password.clone());

    if !cfg.skip_signup {
        let response = client
            .post(url(&cfg, "/signup"))
            .json(&credentials)
            .send()
            .await
            .context("network failure calling /signup")?;
        if response.status() == StatusCode::CONFLICT {
            println!("[smoke-client] signup: user already exists, continuing");
        } else {
            let body: MessageResponse = expect_ok(Ok(response), "/signup").await?;
            println!("[smoke-client] signup: {}", body.message);
        }
    }

    let session = login(&client, &cfg, &credentials).await?;

    let title = format!("smoke poll {}", poll_server::auth_token::now_secs());
    let poll = Poll {
        created_by: String::new(),
        title: title.clone(),
        description: "created by smoke-client".to_string(),
        options: vec!["yes".to_string(), "no".to_string()],
        id: None,
    };
    let created: MessageResponse = expect_ok(
        session
            .apply(client.post(url(&cfg, "/create-poll")))
            .json(&poll)
            .send()
            .await,
        "/create-poll",
    )
    .await?;
    println!("[smoke-client] create-poll: {}", created.message);

    let mine: Vec<Value> = expect_ok(
        session.apply(client.get(url(&cfg, "/my-polls"))).send().await,
        "/my-polls",
    )
    .await?;
    println!("[smoke-client] my-polls: {} entries", mine.len());

    let popular: Vec<Value> = expect_ok(
        client.get(url(&cfg, "/most-popular-polls")).send().await,
        "/most-popular-polls",
    )
    .await?;
    println!("[smoke-client] most-popular-polls: {} entries", popular.len());

    if cfg.skip_vote {
        return Ok(());
    }

    let Some(pollid) = mine
        .iter()
        .filter(|entry| entry.get("title").and_then(Value::as_str) == Some(title.as_str()))
        .find_map(|entry| entry.get("id").and_then(Value::as_i64))
    else {
        println!("[smoke-client] new poll not visible in /my-polls, skipping vote");
        return Ok(());
    };

    let details: Value = expect_ok(
        client
            .get(url(&cfg, "/poll-details"))
            .query(&[("pollid", pollid)])
            .send()
            .await,
        "/poll-details",
    )
    .await?;
    println!("[smoke-client] poll-details: {}", details["poll"]["title"]);

    let vote = Vote {
        pollid,
        optionid: 0,
        votername: String::new(),
        description: Some("smoke vote".to_string()),
    };
    let voted: MessageResponse = expect_ok(
        session
            .apply(client.post(url(&cfg, "/cast-vote")))
            .json(&vote)
            .send()
            .await,
        "/cast-vote",
    )
    .await?;
    println!("[smoke-client] cast-vote: {}", voted.message);

    let has_voted: HasVotedResponse = expect_ok(
        session
            .apply(client.get(url(&cfg, "/has-voted")))
            .query(&[("pollid", pollid)])
            .send()
            .await,
        "/has-voted",
    )
    .await?;
    if !has_voted.has_voted {
        bail!("/has-voted reports no vote right after /cast-vote");
    }
    println!(
        "[smoke-client] has-voted: option {}",
        has_voted.chosenoption.unwrap_or_default()
    );

    let bye: MessageResponse = expect_ok(
        session.apply(client.post(url(&cfg, "/logout"))).send().await,
        "/logout",
    )
    .await?;
    println!("[smoke-client] logout: {}", bye.message);

    Ok(())
}

async fn login(client: &Client, cfg: &SmokeConfig, credentials: &Credentials) -> anyhow::Result<Session> {
    let response = client
        .post(url(cfg, "/login"))
        .json(credentials)
        .send()
        .await
        .context("network failure calling /login")?;

    let mut session = Session::default();
    for cookie in response.cookies() {
        match cookie.name() {
            SESSION_COOKIE => session.session_cookie = Some(cookie.value().to_string()),
            CSRF_COOKIE => session.csrf = cookie.value().to_string(),
            _ => {}
        }
    }

    let body: LoginResponse = expect_ok(Ok(response), "/login").await?;
    session.bearer = body.token;

    if session.csrf.is_empty() {
        bail!("/login did not set a {} cookie", CSRF_COOKIE);
    }
    if session.session_cookie.is_none() && session.bearer.is_none() {
        bail!("/login returned neither a session cookie nor a token");
    }

    println!("[smoke-client] login OK: {} ({})", body.username, body.message);
    Ok(session)
}

async fn expect_ok<T: DeserializeOwned>(
    response: reqwest::Result<Response>,
    path: &str,
) -> anyhow::Result<T> {
    let response = response.with_context(|| format!("network failure calling {}", path))?;
    if response.status() != StatusCode::OK {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        bail!("{} failed with status {}: {}", path, status, body);
    }

    response
        .json()
        .await
        .with_context(|| format!("failed to decode response from {}", path))
}

fn url(cfg: &SmokeConfig, path: &str) -> String {
    format!("{}{}", cfg.http_base.trim_end_matches('/'), path)
}

fn parse_args() -> anyhow::Result<SmokeConfig> {
    let mut cfg = SmokeConfig {
        http_base: "http://127.0.0.1:8080".to_string(),
        username: String::new(),
        password: String::new(),
        timeout_ms: 10_000,
        skip_signup: false,
        skip_vote: false,
    };

    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--http-base" => cfg.http_base = next_arg_value(&mut args, &arg)?,
            "--username" => cfg.username = next_arg_value(&mut args, &arg)?,
            "--password" => cfg.password = next_arg_value(&mut args, &arg)?,
            "--timeout-ms" => {
                let value = next_arg_value(&mut args, &arg)?;
                cfg.timeout_ms = value
                    .parse::<u64>()
                    .with_context(|| format!("invalid --timeout-ms: {}", value))?;
            }
            "--skip-signup" => cfg.skip_signup = true,
            "--skip-vote" => cfg.skip_vote = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                bail!("unknown argument: {}\nUse --help to list the options.", other);
            }
        }
    }

    if cfg.username.is_empty() || cfg.password.is_empty() {
        bail!("--username and --password are required");
    }

    Ok(cfg)
}

fn next_arg_value<I>(args: &mut std::iter::Peekable<I>, flag: &str) -> anyhow::Result<String>
where
    I: Iterator<Item = String>,
{
    args.next().ok_or_else(|| anyhow!("missing value for {}", flag))
}

fn print_help() {
    println!(
        "smoke-client --username <name> --password <pw> [options]\n\n\
         Options:\n  \
         --http-base <url>     server base URL (default http://127.0.0.1:8080)\n  \
         --timeout-ms <ms>     per-request timeout (default 10000)\n  \
         --skip-signup         assume the account already exists\n  \
         --skip-vote           stop after creating and listing the poll\n  \
         -h, --help            show this help"
    );
}
