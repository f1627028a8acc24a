//! End-to-end tests against an in-process fake of the journaling API

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use mood_diary::cache::keys;
use mood_diary::{
    AppContext, Config, DiaryDraft, DiaryService, Error, ErrorKind, LoadOutcome, MoodAttrs,
    StickerShop,
};

const TOKEN: &str = "tok-1";

#[derive(Default)]
struct Backend {
    calendar: BTreeMap<String, Value>,
    diaries: Vec<Value>,
    next_diary_id: i64,
    owned_stickers: Vec<i64>,
    coins: i64,
    fail_mood_writes: bool,
    /// `/check-diary` answers `{"exists": true}` without the id
    check_omits_id: bool,
    fail_checks: bool,
    request_ids: Vec<String>,
    logged_out: bool,
}

type Shared = Arc<Mutex<Backend>>;

fn authorized(headers: &HeaderMap, db: &Shared) -> Result<(), Response> {
    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        db.lock().unwrap().request_ids.push(id.to_string());
    }
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid token"}))).into_response()),
    }
}

fn catalogue() -> Vec<Value> {
    vec![
        json!({"sticker_id": 1, "name": "sun", "image_url": "/s/1.png", "price": 10}),
        json!({"sticker_id": 2, "name": "cloud", "image_url": "/s/2.png", "price": 20}),
    ]
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["user_id"] == "kim" && body["password"] == "secret" {
        Json(json!({
            "token": TOKEN,
            "user": {"user_id": "kim", "name": "Kim", "coins": 100}
        }))
        .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"message": "wrong id or password"}))).into_response()
    }
}

async fn logout(State(db): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    db.lock().unwrap().logged_out = true;
    StatusCode::OK.into_response()
}

async fn user_info(State(db): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let coins = db.lock().unwrap().coins;
    Json(json!({"isSuccess": true, "user": {"user_id": "kim", "name": "Kim", "coins": coins}}))
        .into_response()
}

async fn get_calendar(State(db): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let data: Vec<Value> = db.lock().unwrap().calendar.values().cloned().collect();
    Json(json!({"isSuccess": true, "data": data})).into_response()
}

fn update_day(db: &Shared, body: &Value, field: &str, value: Value) -> Response {
    let mut db = db.lock().unwrap();
    if db.fail_mood_writes {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "db down"}))).into_response();
    }
    let date = body["date"].as_str().unwrap_or_default().to_string();
    let row = db
        .calendar
        .entry(date.clone())
        .or_insert_with(|| json!({"date": format!("{}T00:00:00.000Z", date)}));
    row[field] = value;
    StatusCode::OK.into_response()
}

async fn set_color(State(db): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    update_day(&db, &body, "color", body["color"].clone())
}

async fn set_tag(State(db): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    update_day(&db, &body, "tag", body["tag"].clone())
}

async fn place_sticker(State(db): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    update_day(&db, &body, "color", body["color"].clone());
    update_day(&db, &body, "sticker_id", body["sticker_id"].clone())
}

async fn list_diaries(State(db): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let diaries = db.lock().unwrap().diaries.clone();
    Json(json!({"diaries": diaries})).into_response()
}

async fn get_diary(State(db): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let db = db.lock().unwrap();
    match db.diaries.iter().find(|d| d["id"] == id) {
        Some(diary) => Json(json!({"diary": diary})).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "not found"}))).into_response(),
    }
}

async fn add_diary(State(db): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let mut db = db.lock().unwrap();
    db.next_diary_id += 1;
    body["id"] = json!(db.next_diary_id);
    db.diaries.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn edit_diary(
    State(db): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let mut db = db.lock().unwrap();
    match db.diaries.iter_mut().find(|d| d["id"] == id) {
        Some(diary) => {
            for field in ["date", "title", "content", "one"] {
                diary[field] = body[field].clone();
            }
            Json(json!({"isSuccess": true, "message": "updated"})).into_response()
        }
        None => Json(json!({"isSuccess": false, "message": "no such diary"})).into_response(),
    }
}

async fn delete_diary(State(db): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    db.lock().unwrap().diaries.retain(|d| d["id"] != id);
    Json(json!({"isSuccess": true})).into_response()
}

#[derive(Deserialize)]
struct DateQuery {
    date: String,
}

async fn check_diary(
    State(db): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let db = db.lock().unwrap();
    if db.fail_checks {
        let body = Json(json!({"message": "boom"}));
        return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
    }
    match db.diaries.iter().find(|d| d["date"] == query.date.as_str()) {
        Some(_) if db.check_omits_id => Json(json!({"exists": true})).into_response(),
        Some(diary) => Json(json!({"exists": true, "id": diary["id"]})).into_response(),
        None => Json(json!({"exists": false})).into_response(),
    }
}

async fn get_stickers(State(db): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    Json(json!({"stickers": catalogue()})).into_response()
}

async fn get_user_stickers(State(db): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let owned = db.lock().unwrap().owned_stickers.clone();
    let stickers: Vec<Value> = catalogue()
        .into_iter()
        .filter(|s| owned.iter().any(|id| s["sticker_id"] == *id))
        .collect();
    Json(json!({"stickers": stickers})).into_response()
}

async fn buy_sticker(State(db): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    let id = body["sticker_id"].as_i64().unwrap_or_default();
    let mut db = db.lock().unwrap();
    db.owned_stickers.push(id);
    db.coins -= 10;
    Json(json!({"isSuccess": true, "message": "bought", "coins": db.coins})).into_response()
}

async fn change_password(State(db): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorized(&headers, &db) {
        return r;
    }
    if body["currentPassword"] == "secret" {
        Json(json!({"isSuccess": true, "message": "changed"})).into_response()
    } else {
        Json(json!({"isSuccess": false, "message": "current password is wrong"})).into_response()
    }
}

async fn spawn_backend(backend: Backend) -> (String, Shared) {
    let db: Shared = Arc::new(Mutex::new(backend));
    let app = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/get-user-info", get(user_info))
        .route("/change-password", post(change_password))
        .route("/get-calendar", get(get_calendar))
        .route("/set-mood-color", post(set_color))
        .route("/set-mood-tag", post(set_tag))
        .route("/api/calendar", post(place_sticker))
        .route("/get-diaries", get(list_diaries))
        .route("/get-diary/:id", get(get_diary))
        .route("/add-diary", post(add_diary))
        .route("/edit-diary/:id", put(edit_diary))
        .route("/delete-diary/:id", delete(delete_diary))
        .route("/check-diary", get(check_diary))
        .route("/get-stickers", get(get_stickers))
        .route("/get-user-stickers", get(get_user_stickers))
        .route("/buy-sticker", post(buy_sticker))
        .with_state(Arc::clone(&db));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), db)
}

fn open_context(base_url: &str, dir: &TempDir) -> AppContext {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.request_timeout_secs = 5;
    config.cache.data_dir = dir.path().to_string_lossy().to_string();
    AppContext::open(config).unwrap()
}

async fn logged_in(backend: Backend) -> (AppContext, Shared, TempDir) {
    let (url, db) = spawn_backend(backend).await;
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = open_context(&url, &dir);
    ctx.login("kim", "secret").await.unwrap();
    (ctx, db, dir)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn test_login_persists_session() {
    let (url, _db) = spawn_backend(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();

    {
        let mut ctx = open_context(&url, &dir);
        let user = ctx.login("kim", "secret").await.unwrap().unwrap();
        assert_eq!(user.name, "Kim");
        assert_eq!(ctx.token().unwrap(), TOKEN);
    }

    let ctx = open_context(&url, &dir);
    assert_eq!(ctx.token().unwrap(), TOKEN);
    assert_eq!(ctx.cached_user().unwrap().user_id, "kim");
}

#[tokio::test]
async fn test_wrong_password_is_validation_error() {
    let (url, _db) = spawn_backend(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = open_context(&url, &dir);

    match ctx.login("kim", "nope").await {
        Err(Error::Validation(msg)) => assert_eq!(msg, "wrong id or password"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(!ctx.is_logged_in());
}

#[tokio::test]
async fn test_load_moods_from_server() {
    let mut backend = Backend::default();
    backend.calendar.insert(
        "2024-03-10".to_string(),
        json!({"date": "2024-03-10T00:00:00.000Z", "color": "#FFABAB", "tag": "happy"}),
    );
    backend.calendar.insert(
        "2024-03-11".to_string(),
        json!({"date": "2024-03-11", "color": "", "tag": "tired", "sticker_id": 2}),
    );
    let (ctx, db, _dir) = logged_in(backend).await;

    assert_eq!(ctx.load_moods().await.unwrap(), LoadOutcome::Loaded(2));

    let first = ctx.moods().get(date("2024-03-10")).unwrap();
    assert_eq!(first.color.as_deref(), Some("#FFABAB"));
    assert_eq!(first.tag.as_deref(), Some("happy"));

    let second = ctx.moods().get(date("2024-03-11")).unwrap();
    assert_eq!(second.color, None);
    assert_eq!(second.sticker_id, Some(2));

    let ids = db.lock().unwrap().request_ids.clone();
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
}

#[tokio::test]
async fn test_stale_token_expires_session() {
    let (url, _db) = spawn_backend(Backend::default()).await;
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = mood_diary::LocalCache::open(dir.path()).unwrap();
        cache.set(keys::TOKEN, "stale").unwrap();
    }
    let mut ctx = open_context(&url, &dir);

    let err = ctx.load_moods().await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired));
    assert!(err.needs_login());

    ctx.expire_session().unwrap();
    assert!(matches!(ctx.token(), Err(Error::AuthRequired)));
    assert!(!ctx.cache().contains(keys::TOKEN).unwrap());
}

#[tokio::test]
async fn test_set_mood_merges_on_server() {
    let (ctx, db, _dir) = logged_in(Backend::default()).await;
    let day = date("2024-03-10");

    ctx.set_mood(day, MoodAttrs::default().color("#ffabab")).await.unwrap();
    let entry = ctx.set_mood(day, MoodAttrs::default().tag("happy")).await.unwrap();

    assert_eq!(entry.color.as_deref(), Some("#FFABAB"));
    assert_eq!(entry.tag.as_deref(), Some("happy"));

    let row = db.lock().unwrap().calendar["2024-03-10"].clone();
    assert_eq!(row["color"], "#FFABAB");
    assert_eq!(row["tag"], "happy");

    // A fresh load sees the same merged state
    ctx.load_moods().await.unwrap();
    assert_eq!(ctx.moods().get(day), Some(entry));
}

#[tokio::test]
async fn test_sticker_without_color_uses_first_palette_color() {
    let (ctx, db, _dir) = logged_in(Backend::default()).await;

    ctx.set_mood(date("2024-03-12"), MoodAttrs::default().sticker(1))
        .await
        .unwrap();

    let row = db.lock().unwrap().calendar["2024-03-12"].clone();
    assert_eq!(row["sticker_id"], 1);
    assert_eq!(row["color"], mood_diary::DEFAULT_PALETTE[0]);
}

#[tokio::test]
async fn test_failed_mood_write_keeps_local_value() {
    let (ctx, db, _dir) = logged_in(Backend::default()).await;
    db.lock().unwrap().fail_mood_writes = true;
    let day = date("2024-03-10");

    let err = ctx
        .set_mood(day, MoodAttrs::default().tag("calm"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(ctx.moods().get(day).unwrap().tag.as_deref(), Some("calm"));

    // Next load replaces local state with the server's
    db.lock().unwrap().fail_mood_writes = false;
    ctx.load_moods().await.unwrap();
    assert!(ctx.moods().get(day).is_none());
}

#[tokio::test]
async fn test_diary_lifecycle() {
    let (ctx, _db, _dir) = logged_in(Backend::default()).await;
    let service = DiaryService::for_context(&ctx).unwrap();
    let today = date("2024-03-20");

    let first = service
        .add_on(&DiaryDraft::new(date("2024-03-10"), "Walk", "park").one_line("nice"), today)
        .await
        .unwrap();
    let second = service
        .add_on(&DiaryDraft::new(date("2024-03-15"), "Rain", "stayed in"), today)
        .await
        .unwrap();

    // One diary per date
    let duplicate = service
        .add_on(&DiaryDraft::new(date("2024-03-10"), "Again", "x"), today)
        .await;
    assert!(matches!(duplicate, Err(Error::Validation(_))));

    let listed = service.list().await.unwrap();
    let dates: Vec<NaiveDate> = listed.iter().map(|d| d.date).collect();
    assert_eq!(dates, vec![date("2024-03-15"), date("2024-03-10")]);

    // Moving onto another diary's date is rejected, keeping its own date is not
    let mut draft = DiaryDraft::from_diary(&service.get(&second.id).await.unwrap());
    draft.date = date("2024-03-10");
    assert!(matches!(
        service.edit_on(&second.id, &draft, today).await,
        Err(Error::Validation(_))
    ));

    let mut draft = DiaryDraft::from_diary(&first);
    draft.title = "Long walk".to_string();
    service.edit_on(&first.id, &draft, today).await.unwrap();
    assert_eq!(service.get(&first.id).await.unwrap().title, "Long walk");

    service.delete(&first.id).await.unwrap();
    assert_eq!(service.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_edit_own_diary_when_check_omits_id() {
    let (ctx, db, _dir) = logged_in(Backend::default()).await;
    let service = DiaryService::for_context(&ctx).unwrap();
    let today = date("2024-03-20");

    let diary = service
        .add_on(&DiaryDraft::new(date("2024-03-10"), "Walk", "park"), today)
        .await
        .unwrap();
    db.lock().unwrap().check_omits_id = true;

    let mut draft = DiaryDraft::from_diary(&diary);
    draft.content = "park, then coffee".to_string();
    service.edit_on(&diary.id, &draft, today).await.unwrap();
    assert_eq!(service.get(&diary.id).await.unwrap().content, "park, then coffee");

    // Adding still treats the date as taken
    let duplicate = service
        .add_on(&DiaryDraft::new(date("2024-03-10"), "Again", "x"), today)
        .await;
    assert!(matches!(duplicate, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_failed_availability_check_blocks_edit_only() {
    let (ctx, db, _dir) = logged_in(Backend::default()).await;
    let service = DiaryService::for_context(&ctx).unwrap();
    let today = date("2024-03-20");

    let diary = service
        .add_on(&DiaryDraft::new(date("2024-03-10"), "Walk", "park"), today)
        .await
        .unwrap();
    db.lock().unwrap().fail_checks = true;

    let mut draft = DiaryDraft::from_diary(&diary);
    draft.title = "Changed".to_string();
    let result = service.edit_on(&diary.id, &draft, today).await;
    assert!(matches!(result, Err(Error::Client(_))));
    assert_eq!(service.get(&diary.id).await.unwrap().title, "Walk");

    service
        .add_on(&DiaryDraft::new(date("2024-03-11"), "Rain", "stayed in"), today)
        .await
        .unwrap();
    assert_eq!(service.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sticker_purchase() {
    let backend = Backend {
        owned_stickers: vec![2],
        coins: 100,
        ..Default::default()
    };
    let (ctx, _db, _dir) = logged_in(backend).await;
    let shop = StickerShop::for_context(&ctx).unwrap();

    let view = shop.load().await.unwrap();
    assert_eq!(view.stickers.len(), 2);
    assert!(view.is_owned(2));
    assert_eq!(shop.cached_owned().len(), 1);

    assert!(matches!(shop.purchase(&view, 2).await, Err(Error::Validation(_))));

    let purchase = shop.purchase(&view, 1).await.unwrap();
    assert_eq!(purchase.sticker.name, "sun");
    assert_eq!(purchase.coins, Some(90));

    let owned: Vec<i64> = shop.cached_owned().iter().map(|s| s.sticker_id).collect();
    assert_eq!(owned, vec![1, 2]);
}

#[tokio::test]
async fn test_account_operations() {
    let (ctx, _db, _dir) = logged_in(Backend::default()).await;
    let account = mood_diary::Account::for_context(&ctx).unwrap();

    let profile = account.profile().await.unwrap();
    assert_eq!(profile.user_id, "kim");

    assert!(account.change_password("secret", "new").await.is_ok());
    assert!(matches!(
        account.change_password("wrong", "new").await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let (mut ctx, db, _dir) = logged_in(Backend::default()).await;
    ctx.set_mood(date("2024-03-10"), MoodAttrs::default().tag("ok"))
        .await
        .unwrap();

    ctx.logout().await.unwrap();

    assert!(db.lock().unwrap().logged_out);
    assert!(!ctx.is_logged_in());
    assert!(ctx.moods().is_empty());
    for key in keys::SESSION {
        assert!(!ctx.cache().contains(key).unwrap());
    }

    let err = ctx.load_moods().await.unwrap_err();
    assert!(matches!(err, Error::AuthRequired));
}
