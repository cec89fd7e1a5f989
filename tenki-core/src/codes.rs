//! WMO weather interpretation codes and their Japanese descriptions.
//! See: https://open-meteo.com/en/docs#weathervariables

/// Returned for any code outside the table.
pub const UNKNOWN_WEATHER: &str = "不明な天気";

/// Every code with a description, in table order.
pub const KNOWN_CODES: &[(i32, &str)] = &[
    (0, "快晴"),
    (1, "晴れ"),
    (2, "一部曇り"),
    (3, "曇り"),
    (45, "霧"),
    (48, "着氷性の霧"),
    (51, "弱い霧雨"),
    (53, "霧雨"),
    (55, "強い霧雨"),
    (56, "弱い着氷性の霧雨"),
    (57, "強い着氷性の霧雨"),
    (61, "弱い雨"),
    (63, "雨"),
    (65, "強い雨"),
    (66, "弱い着氷性の雨"),
    (67, "強い着氷性の雨"),
    (71, "弱い雪"),
    (73, "雪"),
    (75, "強い雪"),
    (77, "霧雪"),
    (80, "弱いにわか雨"),
    (81, "にわか雨"),
    (82, "激しいにわか雨"),
    (85, "弱いにわか雪"),
    (86, "強いにわか雪"),
    (95, "雷雨"),
    (96, "雹を伴う雷雨"),
    (99, "激しい雹を伴う雷雨"),
];

pub fn translate(code: i32) -> &'static str {
    KNOWN_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, text)| *text)
        .unwrap_or(UNKNOWN_WEATHER)
}

/// Maps an OpenWeather condition id onto the nearest WMO code.
/// See: https://openweathermap.org/weather-conditions
pub fn from_openweather_id(id: i64) -> i32 {
    match id {
        200..=232 => 95,
        300 | 310 => 51,
        301 | 311 | 313 | 321 => 53,
        302 | 312 | 314 => 55,
        500 => 61,
        501 => 63,
        502..=504 => 65,
        511 => 66,
        520 => 80,
        521 => 81,
        522 | 531 => 82,
        600 | 612 | 615 => 71,
        601 | 611 | 613 | 616 => 73,
        602 => 75,
        620 => 85,
        621 | 622 => 86,
        701..=781 => 45,
        800 => 0,
        801 => 1,
        802 => 2,
        803 | 804 => 3,
        _ => -1,
    }
}
