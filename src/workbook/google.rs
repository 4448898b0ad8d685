//! Google Sheets backend.
//!
//! Authenticates as a service account: a short-lived RS256 JWT is exchanged
//! at the key's `token_uri` for a bearer token, which is reused until shortly
//! before it expires. The spreadsheet is addressed by id when configured,
//! otherwise looked up once by name through the Drive files API.

use super::credentials::ServiceAccountKey;
use super::{Workbook, WorkbookError, Worksheet};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::RefCell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: u64,
}

pub struct GoogleSheets {
    key: ServiceAccountKey,
    spreadsheet_name: String,
    http_client: Client,
    spreadsheet_id: RefCell<Option<String>>,
    token: RefCell<Option<AccessToken>>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn http_err(e: reqwest::Error) -> WorkbookError {
    WorkbookError::Http {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

fn cell_text(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl GoogleSheets {
    pub fn connect(
        key: ServiceAccountKey,
        spreadsheet_name: &str,
        spreadsheet_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, WorkbookError> {
        if spreadsheet_id.is_none() && spreadsheet_name.trim().is_empty() {
            return Err(WorkbookError::Config(
                "sheets.spreadsheet or sheets.spreadsheet_id must be set".to_string(),
            ));
        }
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(timeout)
            .build()
            .map_err(http_err)?;
        Ok(Self {
            key,
            spreadsheet_name: spreadsheet_name.to_string(),
            http_client,
            spreadsheet_id: RefCell::new(spreadsheet_id.filter(|id| !id.trim().is_empty())),
            token: RefCell::new(None),
        })
    }

    fn generate_jwt(&self, now: u64) -> Result<String, WorkbookError> {
        #[derive(Debug, Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: u64,
            exp: u64,
        }

        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| WorkbookError::Credentials(format!("invalid private key: {e}")))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| WorkbookError::Credentials(format!("cannot sign assertion: {e}")))
    }

    fn mint_token(&self, now: u64) -> Result<AccessToken, WorkbookError> {
        #[derive(Debug, Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default)]
            expires_in: Option<u64>,
        }

        let assertion = self.generate_jwt(now)?;
        let response = self
            .http_client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "unable to read token response body".to_string());
            return Err(WorkbookError::Auth(format!("{}: {}", status.as_u16(), message)));
        }
        let payload: TokenResponse = response
            .json()
            .map_err(|e| WorkbookError::Malformed(format!("token response: {e}")))?;
        tracing::debug!(client_email = %self.key.client_email, "minted access token");
        Ok(AccessToken {
            value: payload.access_token,
            expires_at: now + payload.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
        })
    }

    fn access_token(&self) -> Result<String, WorkbookError> {
        let now = unix_now();
        if let Some(tok) = self.token.borrow().as_ref() {
            if tok.expires_at > now + TOKEN_REFRESH_MARGIN_SECS {
                return Ok(tok.value.clone());
            }
        }
        let fresh = self.mint_token(now)?;
        let value = fresh.value.clone();
        *self.token.borrow_mut() = Some(fresh);
        Ok(value)
    }

    fn spreadsheet_id(&self) -> Result<String, WorkbookError> {
        if let Some(id) = self.spreadsheet_id.borrow().as_ref() {
            return Ok(id.clone());
        }

        #[derive(Debug, Deserialize)]
        struct DriveFile {
            id: String,
        }
        #[derive(Debug, Deserialize)]
        struct FileList {
            #[serde(default)]
            files: Vec<DriveFile>,
        }

        let name = self.spreadsheet_name.replace('\\', "\\\\").replace('\'', "\\'");
        let query = format!("name = '{name}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false");
        let response = self
            .http_client
            .get(DRIVE_FILES_API)
            .bearer_auth(self.access_token()?)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .map_err(http_err)?;
        let list: FileList = check_status(response, &self.spreadsheet_name)?
            .json()
            .map_err(|e| WorkbookError::Malformed(format!("drive file list: {e}")))?;
        let id = list
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| WorkbookError::SpreadsheetNotFound(self.spreadsheet_name.clone()))?;
        tracing::info!(spreadsheet = %self.spreadsheet_name, id = %id, "resolved spreadsheet");
        *self.spreadsheet_id.borrow_mut() = Some(id.clone());
        Ok(id)
    }

    fn values_url(&self, segment: &str) -> Result<Url, WorkbookError> {
        let id = self.spreadsheet_id()?;
        let mut url = Url::parse(SHEETS_API)
            .map_err(|e| WorkbookError::Config(format!("bad sheets endpoint: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| WorkbookError::Config("sheets endpoint cannot be a base".to_string()))?
            .push(&id)
            .push("values")
            .push(segment);
        Ok(url)
    }
}

fn check_status(response: Response, target: &str) -> Result<Response, WorkbookError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .unwrap_or_else(|_| "unable to read response body".to_string());
    Err(match status.as_u16() {
        400 if message.contains("Unable to parse range") => {
            WorkbookError::WorksheetNotFound(target.to_string())
        }
        401 | 403 => WorkbookError::Auth(message),
        404 => WorkbookError::SpreadsheetNotFound(target.to_string()),
        code => WorkbookError::Http {
            status: Some(code),
            message,
        },
    })
}

impl Workbook for GoogleSheets {
    fn backend(&self) -> &'static str {
        "google"
    }

    fn read_worksheet(&self, title: &str) -> Result<Worksheet, WorkbookError> {
        #[derive(Debug, Deserialize)]
        struct ValueRange {
            #[serde(default)]
            values: Vec<Vec<serde_json::Value>>,
        }

        let url = self.values_url(title)?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(self.access_token()?)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .map_err(http_err)?;
        let range: ValueRange = check_status(response, title)?
            .json()
            .map_err(|e| WorkbookError::Malformed(format!("values of {title}: {e}")))?;
        let values = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        Ok(Worksheet::from_values(title, values))
    }

    fn append_row(&self, title: &str, row: &[String]) -> Result<(), WorkbookError> {
        let url = self.values_url(&format!("{title}:append"))?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(self.access_token()?)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }))
            .send()
            .map_err(http_err)?;
        check_status(response, title)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_render_as_text() {
        assert_eq!(cell_text(json!("08:00")), "08:00");
        assert_eq!(cell_text(json!(null)), "");
        assert_eq!(cell_text(json!(3)), "3");
    }
}
