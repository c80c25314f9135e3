use metrics::counter;
use serde_json::json;
use uuid::Uuid;

use crate::models::PortfolioPnl;
use crate::portfolio::simulator::TradeReceipt;

/// Fire-and-forget reporting to an external backend. Failures are logged
/// but never block or fail the operation being reported.
#[derive(Debug, Clone)]
pub struct Reporter {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    agent_id: String,
}

impl Reporter {
    pub fn new(
        http: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
        agent_id: String,
    ) -> Self {
        Self {
            http,
            endpoint,
            api_key,
            agent_id,
        }
    }

    /// POST a payload to the backend. Failures are logged as warnings.
    pub async fn send(&self, information: serde_json::Value) {
        let body = json!({
            "runtimeAgentId": self.agent_id,
            "information": information,
        });

        let mut req = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        match req.send().await {
            Ok(resp) => {
                if resp.status().is_success() {
                    counter!("reports_sent_total").increment(1);
                } else {
                    tracing::warn!(
                        status = %resp.status(),
                        "Reporting backend returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send report");
            }
        }
    }

    pub async fn report_trade(&self, receipt: &TradeReceipt, explanation: &str) {
        self.send(json!({
            "tradeId": Uuid::new_v4().to_string(),
            "tradeType": "simulateTrade",
            "trade": {
                "fromToken": receipt.from_token,
                "toToken": receipt.to_token,
                "fromAmount": receipt.from_amount,
                "toAmount": receipt.to_amount,
                "price": receipt.price,
                "explanation": explanation,
            },
        }))
        .await;
    }

    /// A conscious decision not to trade is reported too, so the audit trail
    /// shows inactivity was deliberate.
    pub async fn report_no_trade(&self, explanation: &str) {
        self.send(json!({
            "tradeId": Uuid::new_v4().to_string(),
            "tradeType": "noTrade",
            "decision": {
                "action": "wait",
                "explanation": explanation,
            },
        }))
        .await;
    }

    pub async fn report_pnl(&self, pnl: &PortfolioPnl) {
        self.send(json!({
            "tradeType": "portfolioPnl",
            "pnl": {
                "totalValue": pnl.total_value,
                "totalPnl": pnl.total_pnl,
                "pnlPercentage": pnl.pnl_percentage,
                "tokenCount": pnl.tokens.len(),
            },
        }))
        .await;
    }
}
