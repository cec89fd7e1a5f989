//! All user-visible text of the widget.

use crate::error::LocationError;

pub const LOCATING: &str = "位置情報を取得しています…";
pub const FETCHING_WEATHER: &str = "天気情報を取得しています…";
pub const WEATHER_FAILED: &str = "天気情報の取得に失敗しました。しばらくしてから再試行してください。";
pub const SHOWING_LATEST: &str = "最新の天気を表示しています。";

pub const EMPTY_QUERY: &str = "地名を入力してください。";
pub const SEARCH_FAILED: &str = "場所の検索に失敗しました。しばらくしてから再試行してください。";

pub const TRIGGER_FIRST_USE: &str = "現在地の天気を取得";
pub const TRIGGER_REFETCH: &str = "現在地の天気を再取得";
pub const TRIGGER_BUSY: &str = "取得中…";

pub fn searching(query: &str) -> String {
    format!("「{query}」を検索しています…")
}

pub fn no_candidates(query: &str) -> String {
    format!("「{query}」に一致する場所が見つかりませんでした。")
}

pub fn choose_candidate(count: usize) -> String {
    format!("{count}件の候補が見つかりました。場所を選択してください。")
}

pub fn location_failed(err: &LocationError) -> &'static str {
    match err {
        LocationError::PermissionDenied => "位置情報の利用が拒否されました。設定を確認してください。",
        LocationError::PositionUnavailable(_) => {
            "位置情報を取得できませんでした。環境を確認して再試行してください。"
        }
        LocationError::Timeout => "位置情報の取得がタイムアウトしました。再試行してください。",
        LocationError::Unsupported(_) => {
            "この環境では位置情報を利用できません（未対応、または安全な接続ではありません）。"
        }
        LocationError::Other(_) => "位置情報の取得に失敗しました。再試行してください。",
    }
}
