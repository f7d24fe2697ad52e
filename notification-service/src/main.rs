use aws_lambda_events::event::sns::SnsEvent;
use gather_shared::mailer::Mailer;
use gather_shared::store::dynamo::DynamoStore;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::{error, info};
use std::sync::Arc;

mod dispatch;
mod errors;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting Notification Service Lambda");

    let store = Arc::new(DynamoStore::new().await);
    let mailer = Arc::new(Mailer::from_env());

    lambda_runtime::run(service_fn(|event| {
        handler(event, store.clone(), mailer.clone())
    }))
    .await?;
    Ok(())
}

async fn handler(
    event: LambdaEvent<SnsEvent>,
    store: Arc<DynamoStore>,
    mailer: Arc<Mailer>,
) -> Result<(), Error> {
    for record in event.payload.records {
        let message = record.sns;
        info!("Processing SNS message: {:?}", message.message_id);

        // One bad record must not block the rest of the batch
        match dispatch::process_message(&*store, &mailer, &message.message).await {
            Ok(sent) => info!("Message {:?} produced {} emails", message.message_id, sent),
            Err(e) => error!("Failed to handle SNS message {:?}: {:#}", message.message_id, e),
        }
    }

    Ok(())
}
