use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_sqs::types::QueueAttributeName;
use sqs2rds_core::{QueueDepth, QueueDepthSource};
use std::collections::HashMap;

/// Queue message counts via SQS `GetQueueAttributes`.
pub struct SqsDepthSource {
    client: aws_sdk_sqs::Client,
}

impl SqsDepthSource {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueueDepthSource for SqsDepthSource {
    async fn fetch_queue_depth(&self, queue_url: &str) -> Result<QueueDepth> {
        let response = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesDelayed)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
            .send()
            .await
            .context("SQS GetQueueAttributes failed")?;

        let Some(attributes) = response.attributes() else {
            // A gap, not an error: the evaluator fails open on missing data.
            tracing::warn!(queue_url, "queue attributes absent from response");
            return Ok(QueueDepth::default());
        };

        Ok(QueueDepth {
            visible: count(attributes, &QueueAttributeName::ApproximateNumberOfMessages),
            delayed: count(attributes, &QueueAttributeName::ApproximateNumberOfMessagesDelayed),
            in_flight: count(
                attributes,
                &QueueAttributeName::ApproximateNumberOfMessagesNotVisible,
            ),
        })
    }
}

fn count(attributes: &HashMap<QueueAttributeName, String>, name: &QueueAttributeName) -> i64 {
    let Some(raw) = attributes.get(name) else {
        tracing::warn!(attribute = name.as_str(), "queue attribute missing, counting as zero");
        return 0;
    };
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(attribute = name.as_str(), value = %raw, "unparseable queue attribute, counting as zero");
        0
    })
}
