//! # Lambda ハンドラ
//!
//! Lambda ランタイムから受け取ったイベントをユースケースに渡し、
//! 受け取った JSON をそのまま返す。
//!
//! 各呼び出しは `invocation` スパンの中で実行され、リクエスト ID と
//! トリガー種別がすべてのログに付与される。

use hyrise_domain::InboundEvent;
use hyrise_shared::{
    event_log::{error, event},
    log_business_event,
};
use lambda_runtime::LambdaEvent;
use serde_json::Value;
use tracing::Instrument as _;

use crate::{error::HandlerError, usecase::CustomEmailUseCase};

/// Lambda イベントを処理する
pub async fn handle(
    usecase: &CustomEmailUseCase,
    event: LambdaEvent<Value>,
) -> Result<Value, HandlerError> {
    let (payload, context) = event.into_parts();
    let span = tracing::info_span!(
        "invocation",
        request_id = %context.request_id,
        trigger_source = tracing::field::Empty,
    );

    handle_payload(usecase, payload).instrument(span).await
}

/// イベント JSON を処理し、同じ JSON を返す
///
/// 復号失敗と不正なイベントのみ `Err` を返す。
pub async fn handle_payload(
    usecase: &CustomEmailUseCase,
    payload: Value,
) -> Result<Value, HandlerError> {
    let event = InboundEvent::from_value(&payload).inspect_err(|e| {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::EVENT_REJECTED,
            event.result = event::result::FAILURE,
            error.category = error::category::INPUT,
            error.kind = error::kind::INVALID_EVENT,
            error = %e,
            "イベントの形式が不正です"
        );
    })?;
    tracing::Span::current().record("trigger_source", event.trigger_source());

    match usecase.execute(&event).await {
        Ok(outcome) => {
            tracing::info!(outcome = outcome.label(), "呼び出しを完了しました");
            Ok(payload)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                span_trace = %e.span_trace(),
                "確認コードの復号に失敗したため呼び出しを失敗させます"
            );
            Err(HandlerError::Decryption(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use hyrise_domain::{KeyId, clock::FixedClock};
    use hyrise_infra::mock::{MockCodeDecryptor, MockNotificationSender};
    use serde_json::json;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::usecase::TemplateRenderer;

    #[derive(Clone, Default)]
    struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedWriter {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn usecase(decryptor: MockCodeDecryptor) -> CustomEmailUseCase {
        CustomEmailUseCase::new(
            Arc::new(decryptor),
            Arc::new(MockNotificationSender::new()),
            TemplateRenderer::new(Arc::new(FixedClock::at_year(2025))).unwrap(),
            KeyId::new("arn:aws:kms:us-east-1:111122223333:key/test"),
        )
    }

    #[tokio::test]
    async fn test_不正なイベントはビジネスイベントとして記録して失敗する() {
        let writer = CapturedWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_writer(writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let decryptor = MockCodeDecryptor::returning("482913");

        let result = handle_payload(&usecase(decryptor.clone()), json!(["not", "an", "object"])).await;

        assert!(matches!(result, Err(HandlerError::InvalidEvent(_))));
        assert!(decryptor.calls().is_empty());
        let output = String::from_utf8(writer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains(r#""event.kind":"business_event""#), "{output}");
        assert!(output.contains(r#""event.action":"event.rejected""#), "{output}");
        assert!(output.contains(r#""error.kind":"invalid_event""#), "{output}");
    }
}
