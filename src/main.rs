/*
 * Responsibility
 * - tokio runtime 起動
 * - app::run() の呼び出し（ロジックは置かない）
 */
use dasvid::app;
use dasvid::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    app::run().await
}
