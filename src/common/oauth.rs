use crate::common::metrics;
use crate::common::strava_client::{OAuthTokenRequest, OAuthTokenResponse, StravaClient};
use crate::common::token_store::TokenStore;
use crate::common::types::{CommuteError, CommuteResult, Secrets, TokenSet};
use std::future::Future;
use std::io::{self, BufRead, Write};
use tracing::{debug, info};
use url::Url;

const REDIRECT_URI: &str = "http://localhost/exchange_token";
const SCOPES: &str = "activity:read_all,read_all,profile:read_all";

const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// Performs the OAuth2 grants against the provider token endpoint.
/// Persisting the returned tokens is up to the caller.
pub struct OAuthClient {
    client: StravaClient,
}

impl OAuthClient {
    pub fn new(client: StravaClient) -> Self {
        Self { client }
    }

    pub async fn exchange_authorization_code(
        &self,
        secrets: &Secrets,
        code: &str,
    ) -> CommuteResult<TokenSet> {
        secrets.validate()?;

        let request = OAuthTokenRequest {
            client_id: secrets.client_id,
            client_secret: &secrets.client_secret,
            grant_type: GRANT_AUTHORIZATION_CODE,
            code: Some(code),
            refresh_token: None,
        };

        let mut tokens = self.grant(GRANT_AUTHORIZATION_CODE, &request).await?;
        tokens.auth_code = code.to_string();
        Ok(tokens)
    }

    /// The returned refresh token supersedes `refresh_token`, which the
    /// provider invalidates.
    pub async fn refresh(&self, secrets: &Secrets, refresh_token: &str) -> CommuteResult<TokenSet> {
        secrets.validate()?;

        let request = OAuthTokenRequest {
            client_id: secrets.client_id,
            client_secret: &secrets.client_secret,
            grant_type: GRANT_REFRESH_TOKEN,
            code: None,
            refresh_token: Some(refresh_token),
        };

        self.grant(GRANT_REFRESH_TOKEN, &request).await
    }

    pub fn authorize_url(&self, secrets: &Secrets) -> CommuteResult<Url> {
        Url::parse_with_params(
            &self.client.authorize_endpoint(),
            &[
                ("client_id", secrets.client_id.to_string().as_str()),
                ("response_type", "code"),
                ("redirect_uri", REDIRECT_URI),
                ("approval_prompt", "force"),
                ("scope", SCOPES),
            ],
        )
        .map_err(|e| CommuteError::InvalidConfiguration(format!("bad authorize endpoint: {e}")))
    }

    async fn grant(
        &self,
        grant_type: &'static str,
        request: &OAuthTokenRequest<'_>,
    ) -> CommuteResult<TokenSet> {
        let result = self
            .client
            .request_token(request)
            .await
            .and_then(into_token_set);

        match &result {
            Ok(_) => metrics::increment_oauth_grant_success(grant_type),
            Err(_) => metrics::increment_oauth_grant_failure(grant_type),
        }
        result
    }
}

fn into_token_set(response: OAuthTokenResponse) -> CommuteResult<TokenSet> {
    let refresh_token = response.refresh_token.ok_or_else(|| {
        CommuteError::ResponseMalformed("OAuth response has no refresh_token".to_string())
    })?;
    let access_token = response.access_token.ok_or_else(|| {
        CommuteError::ResponseMalformed("OAuth response has no access_token".to_string())
    })?;

    debug!("OAuth grant succeeded, token expires at {:?}", response.expires_at);
    Ok(TokenSet {
        auth_code: String::new(),
        refresh_token,
        access_token,
    })
}

/// Pulls the `code` query parameter out of the redirect URL the provider sent
/// the browser to.
pub fn extract_auth_code(redirect_url: &str) -> CommuteResult<String> {
    let trimmed = redirect_url.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| CommuteError::InvalidInput(format!("unable to parse URL {trimmed}: {e}")))?;

    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            CommuteError::InvalidInput(format!(
                "the code key could not be found in the supplied URL: {trimmed}"
            ))
        })
}

/// Obtains the redirect URL from the operator once they have approved access.
pub trait AuthorizationPrompt: Send + Sync {
    fn redirect_url(
        &self,
        authorize_url: &Url,
    ) -> impl Future<Output = CommuteResult<String>> + Send;
}

/// Asks on the console. The blocking read runs on tokio's blocking pool.
pub struct StdinPrompt;

impl AuthorizationPrompt for StdinPrompt {
    async fn redirect_url(&self, authorize_url: &Url) -> CommuteResult<String> {
        let authorize_url = authorize_url.clone();
        tokio::task::spawn_blocking(move || read_redirect_url(&authorize_url))
            .await
            .map_err(|e| CommuteError::TaskFailed(format!("console prompt: {e}")))?
    }
}

fn read_redirect_url(authorize_url: &Url) -> CommuteResult<String> {
    let console_error =
        |e: io::Error| CommuteError::InvalidInput(format!("unable to use the console: {e}"));

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "Enter the following into your web browser:").map_err(console_error)?;
    writeln!(stdout, "   {authorize_url}").map_err(console_error)?;
    write!(stdout, "\nCopy and paste the URL from the browser: ").map_err(console_error)?;
    stdout.flush().map_err(console_error)?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(console_error)?;
    Ok(line.trim().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    NeedAuthCode,
    HaveRefreshToken(TokenSet),
    HaveAccessToken(TokenSet),
}

/// Authenticated session for one run. Constructed once, then shared by
/// reference with every fetch.
#[derive(Debug, Clone)]
pub struct OAuthSession {
    tokens: TokenSet,
}

impl OAuthSession {
    pub fn from_tokens(tokens: TokenSet) -> Self {
        Self { tokens }
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }

    pub async fn establish(
        store: &TokenStore,
        oauth: &OAuthClient,
        prompt: &impl AuthorizationPrompt,
    ) -> CommuteResult<Self> {
        let secrets = store.load_secrets()?;
        secrets.validate()?;

        let mut state = initial_state(store)?;
        loop {
            state = match state {
                SessionState::NeedAuthCode => {
                    let authorize_url = oauth.authorize_url(&secrets)?;
                    let redirect_url = prompt.redirect_url(&authorize_url).await?;
                    info!("Operator supplied redirect URL");

                    let code = extract_auth_code(&redirect_url)?;
                    let tokens = oauth.exchange_authorization_code(&secrets, &code).await?;
                    store.save_tokens(&tokens)?;
                    SessionState::HaveRefreshToken(tokens)
                }
                SessionState::HaveRefreshToken(tokens) => {
                    let mut refreshed = oauth.refresh(&secrets, &tokens.refresh_token).await?;
                    refreshed.auth_code = tokens.auth_code;
                    store.save_tokens(&refreshed)?;
                    SessionState::HaveAccessToken(refreshed)
                }
                SessionState::HaveAccessToken(tokens) => {
                    info!("OAuth session established");
                    return Ok(Self { tokens });
                }
            };
        }
    }
}

fn initial_state(store: &TokenStore) -> CommuteResult<SessionState> {
    match store.load_tokens() {
        Ok(tokens) if !tokens.refresh_token.is_empty() => Ok(SessionState::HaveRefreshToken(tokens)),
        Ok(_) => {
            info!("Stored tokens have no refresh token, authorization required");
            Ok(SessionState::NeedAuthCode)
        }
        Err(CommuteError::NotFound(path)) => {
            info!("No token file at {}, authorization required", path.display());
            Ok(SessionState::NeedAuthCode)
        }
        Err(e) => Err(e),
    }
}
