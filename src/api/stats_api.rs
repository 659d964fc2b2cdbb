use crate::api::retry::{retry_with_backoff, RetryPolicy};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::{RawGameRow, ScheduledGame};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

const LEAGUE_ID: &str = "00";
const GAME_HEADER_SET: &str = "GameHeader";

// stats.nba.com rejects requests that don't look like they come from a browser
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
const NBA_ORIGIN: &str = "https://www.nba.com";
const NBA_REFERER: &str = "https://www.nba.com/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonType {
    Regular,
    Playoffs,
}

impl SeasonType {
    fn as_query(&self) -> &'static str {
        match self {
            SeasonType::Regular => "Regular Season",
            SeasonType::Playoffs => "Playoffs",
        }
    }
}

/// Tabular payload shared by every stats endpoint
#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Each row as a `HEADER -> value` object
    fn records(&self) -> impl Iterator<Item = Map<String, Value>> + '_ {
        self.row_set.iter().map(|row| {
            self.headers
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect::<Map<String, Value>>()
        })
    }
}

pub struct StatsApiClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl StatsApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ORIGIN, HeaderValue::from_static(NBA_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static(NBA_REFERER));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                base_delay: config.base_backoff,
            },
        })
    }

    /// Every team game of the league for the given season type
    pub async fn fetch_game_log(&self, season_type: SeasonType) -> Result<Vec<RawGameRow>> {
        let response = self
            .get_json(
                "leaguegamefinder",
                &[
                    ("LeagueID", LEAGUE_ID),
                    ("PlayerOrTeam", "T"),
                    ("SeasonType", season_type.as_query()),
                ],
            )
            .await?;

        let rows = parse_game_log(response)?;
        info!("Fetched {} team game rows", rows.len());
        Ok(rows)
    }

    /// Games scheduled on `date`
    pub async fn fetch_scoreboard(&self, date: NaiveDate) -> Result<Vec<ScheduledGame>> {
        let day = date.format("%Y-%m-%d").to_string();
        let response = self
            .get_json(
                "scoreboardv2",
                &[
                    ("GameDate", day.as_str()),
                    ("LeagueID", LEAGUE_ID),
                    ("DayOffset", "0"),
                ],
            )
            .await?;

        let games = parse_scoreboard(response, date)?;
        info!("Found {} games scheduled on {}", games.len(), day);
        Ok(games)
    }

    async fn get_json(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<StatsResponse> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "stats API request");

        let client = &self.client;
        let url = url.as_str();
        retry_with_backoff(&self.retry, endpoint, move || async move {
            let response = client.get(url).query(query).send().await?;
            if !response.status().is_success() {
                return Err(Error::Api(format!(
                    "{} returned {}",
                    endpoint,
                    response.status()
                )));
            }
            let body: StatsResponse = response.json().await?;
            Ok(body)
        })
        .await
    }
}

fn parse_game_log(response: StatsResponse) -> Result<Vec<RawGameRow>> {
    let set = response
        .result_sets
        .first()
        .ok_or_else(|| Error::Api("leaguegamefinder returned no result sets".into()))?;

    let mut rows = Vec::with_capacity(set.row_set.len());
    let mut skipped = 0usize;
    for record in set.records() {
        match serde_json::from_value::<RawGameRow>(Value::Object(record)) {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!("skipping malformed game log row: {}", e);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {} malformed game log rows", skipped);
    }
    Ok(rows)
}

fn parse_scoreboard(response: StatsResponse, date: NaiveDate) -> Result<Vec<ScheduledGame>> {
    let set = response
        .result_sets
        .iter()
        .find(|s| s.name == GAME_HEADER_SET)
        .ok_or_else(|| Error::Api("scoreboard has no GameHeader result set".into()))?;

    Ok(set
        .records()
        .filter_map(|record| {
            // The feed sometimes carries placeholder rows without team ids
            let home_team_id = record.get("HOME_TEAM_ID")?.as_i64()?;
            let visitor_team_id = record.get("VISITOR_TEAM_ID")?.as_i64()?;
            let game_id = match record.get("GAME_ID")? {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(ScheduledGame {
                game_id,
                game_date: date,
                home_team_id,
                visitor_team_id,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME_LOG: &str = r#"{
        "resource": "leaguegamefinderresults",
        "resultSets": [{
            "name": "LeagueGameFinderResults",
            "headers": ["SEASON_ID","TEAM_ID","TEAM_ABBREVIATION","TEAM_NAME","GAME_ID","GAME_DATE","MATCHUP","WL","MIN","PTS","FGM","FGA","FG_PCT","FG3M","FG3A","FTM","FTA","OREB","DREB","REB","AST","STL","BLK","TOV","PF","PLUS_MINUS"],
            "rowSet": [
                ["22023",1610612747,"LAL","Los Angeles Lakers","0022300061","2024-01-13","LAL vs. UTA","W",240,132,50,92,0.543,14,33,18,24,10,36,46,30,6,5,13,17,7.0],
                ["22023",1610612762,"UTA","Utah Jazz","0022300061","2024-01-13","UTA @ LAL",null,240,125,46,95,0.484,12,38,21,26,12,30,42,27,9,3,15,20,-7.0]
            ]
        }]
    }"#;

    const SCOREBOARD: &str = r#"{
        "resultSets": [
            {
                "name": "GameHeader",
                "headers": ["GAME_DATE_EST","GAME_SEQUENCE","GAME_ID","GAME_STATUS_ID","HOME_TEAM_ID","VISITOR_TEAM_ID"],
                "rowSet": [
                    ["2024-01-15T00:00:00",1,"0022300580",1,1610612747,1610612738],
                    ["2024-01-15T00:00:00",2,"0022300581",1,null,null]
                ]
            },
            {
                "name": "LineScore",
                "headers": ["GAME_ID"],
                "rowSet": []
            }
        ]
    }"#;

    #[test]
    fn test_parse_game_log() {
        let response: StatsResponse = serde_json::from_str(GAME_LOG).unwrap();
        let rows = parse_game_log(response).unwrap();
        assert_eq!(rows.len(), 2);

        let lakers = &rows[0];
        assert_eq!(lakers.game_id, "0022300061");
        assert_eq!(lakers.team_id, 1610612747);
        assert_eq!(lakers.is_home(), Some(true));
        assert_eq!(lakers.won(), Some(true));
        assert_eq!(lakers.fga, Some(92.0));
        assert_eq!(lakers.fg3m, Some(14.0));
        assert_eq!(lakers.oreb, Some(10.0));

        let jazz = &rows[1];
        assert_eq!(jazz.is_home(), Some(false));
        assert_eq!(jazz.won(), None);
        assert_eq!(jazz.tov, Some(15.0));
    }

    #[test]
    fn test_parse_game_log_skips_malformed_rows() {
        let payload = r#"{
            "resultSets": [{
                "name": "LeagueGameFinderResults",
                "headers": ["TEAM_ID","TEAM_ABBREVIATION","GAME_ID","GAME_DATE","MATCHUP","WL","FGA"],
                "rowSet": [
                    [1610612747,"LAL","0022300061","2024-01-13","LAL vs. UTA","W",92],
                    [null,"UTA","0022300061","2024-01-13","UTA @ LAL","L",95],
                    [1610612738,"BOS",null,"2024-01-13","BOS vs. MIA","W",88]
                ]
            }]
        }"#;
        let response: StatsResponse = serde_json::from_str(payload).unwrap();
        let rows = parse_game_log(response).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].team_id, 1610612747);
        assert_eq!(rows[0].fga, Some(92.0));
    }

    #[test]
    fn test_parse_scoreboard_skips_rows_without_teams() {
        let response: StatsResponse = serde_json::from_str(SCOREBOARD).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let games = parse_scoreboard(response, date).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, "0022300580");
        assert_eq!(games[0].home_team_id, 1610612747);
        assert_eq!(games[0].visitor_team_id, 1610612738);
    }

    #[test]
    fn test_missing_result_sets() {
        let response: StatsResponse = serde_json::from_str(r#"{"resultSets": []}"#).unwrap();
        assert!(matches!(parse_game_log(response), Err(Error::Api(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_game_log() {
        let client = StatsApiClient::new(&ApiConfig::default()).unwrap();
        let rows = client.fetch_game_log(SeasonType::Regular).await.unwrap();
        assert!(!rows.is_empty());
    }
}
