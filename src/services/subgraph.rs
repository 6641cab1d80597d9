use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::errors::BackendError;
use crate::models::subgraph::{
    GraphQlResponse, LinePageData, LinesData, PortfolioData, RawLinePage, RawLineSummary,
};

/// GraphQL client for the lending-protocol subgraph.
///
/// One network request per call: no retry, no timeout, no in-flight
/// coalescing. Callers decide whether a failed fetch is retried.
#[derive(Clone)]
pub struct SubgraphService {
    client: Client,
    url: String,
}

const LINE_PAGE_QUERY: &str = r#"
query GetLinePage($id: ID!) {
  lineOfCredit(id: $id) {
    id
    start
    end
    status
    borrower
    credits {
      id
      lender
      deposit
      drawnRate
      principal
      interest
      interestRepaid
      token { symbol decimals }
      events { __typename timestamp amount value }
    }
    spigot {
      id
      spigots {
        id
        contract
        active
        token { symbol decimals }
        events { timestamp amount }
      }
    }
    escrow {
      id
      deposits {
        id
        amount
        enabled
        token { symbol decimals }
        events { timestamp amount }
      }
    }
  }
}
"#;

const USER_PORTFOLIO_QUERY: &str = r#"
query GetUserPortfolio($user: String!) {
  borrower: lineOfCredits(where: { borrower: $user }) {
    id
    borrower
    status
    start
    end
  }
  lender: credits(where: { lender: $user }) {
    id
    deposit
    principal
    interest
    token { symbol decimals }
    line { id }
  }
}
"#;

impl SubgraphService {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the full page payload for one line. `None` means the subgraph
    /// has no line at that address.
    pub async fn get_line_page(&self, id: &str) -> Result<Option<RawLinePage>, BackendError> {
        tracing::debug!("Fetching line page for {} from subgraph", id);

        let data: LinePageData = self
            .execute(LINE_PAGE_QUERY, json!({ "id": id }))
            .await?;

        Ok(data.line_of_credit)
    }

    /// List lines. `order_by` and `order_direction` land in enum positions of
    /// the schema, so they are whitelisted and interpolated rather than
    /// passed as variables.
    pub async fn get_lines(
        &self,
        first: u32,
        order_by: &str,
        order_direction: &str,
    ) -> Result<Vec<RawLineSummary>, BackendError> {
        let order_by = match order_by {
            "id" | "borrower" | "start" | "end" => order_by,
            _ => "start",
        };
        let order_direction = match order_direction {
            "asc" | "desc" => order_direction,
            _ => "desc",
        };

        let query = format!(
            r#"
query GetLines($first: Int!) {{
  lineOfCredits(first: $first, orderBy: {order_by}, orderDirection: {order_direction}) {{
    id
    borrower
    status
    start
    end
  }}
}}
"#
        );

        let data: LinesData = self.execute(&query, json!({ "first": first })).await?;
        Ok(data.line_of_credits)
    }

    /// Fetch all lines a user borrows on plus all positions they lend to.
    pub async fn get_user_portfolio(&self, user: &str) -> Result<PortfolioData, BackendError> {
        tracing::debug!("Fetching portfolio for {} from subgraph", user);

        self.execute(USER_PORTFOLIO_QUERY, json!({ "user": user }))
            .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, BackendError> {
        let response = self
            .client
            .post(&self.url)
            .header("accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Subgraph(format!(
                "subgraph HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;

        // Deserialization failures are a distinct failure class from
        // transport errors: the bytes arrived but violated the contract.
        let envelope: GraphQlResponse<T> = serde_json::from_str(&body)
            .map_err(|e| BackendError::MalformedData(format!("unexpected response shape: {e}")))?;

        if let Some(errors) = envelope.errors {
            if !errors.is_empty() {
                let messages = errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(BackendError::Subgraph(messages));
            }
        }

        envelope.data.ok_or_else(|| {
            BackendError::MalformedData("response carried neither data nor errors".to_string())
        })
    }
}
