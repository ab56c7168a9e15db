//! App - アプリケーション層
//!
//! queue と select を組み合わせて、ホスト（CLI・UI）向けの窓口を提供します。
//!
//! # 主要コンポーネント
//! - **StashBuilder / Stash**: 設定からのワイヤリングと Save / Load / Resolve の窓口
//! - **Reporter**: queue と selection の説明行
//! - **PreviewService**: JSON の preview エンドポイント

pub mod builder;
pub mod preview;
pub mod status;

pub use self::builder::{Stash, StashBuilder};
pub use self::preview::{PreviewRequest, PreviewResponse, PreviewService};
pub use self::status::Reporter;
