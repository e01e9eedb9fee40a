// HTTP request handlers
use crate::domain::snapshot::ChartSnapshot;
use crate::infrastructure::svg_chart::{render_svg, CHART_WIDTH};
use crate::presentation::app_state::AppState;
use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;

pub const CHART_HEADING: &str = "Darkness vs. Time";

#[derive(Template)]
#[template(path = "chart.html")]
pub struct ChartPageTemplate {
    pub heading: &'static str,
    pub max_width: u32,
    pub svg: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Chart page - heading plus the live chart
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let svg = render_svg(&state.chart.current()).unwrap_or_else(|e| {
        tracing::error!("{}", e);
        String::new()
    });

    let template = ChartPageTemplate {
        heading: CHART_HEADING,
        max_width: CHART_WIDTH,
        svg,
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn chart_svg(State(state): State<Arc<AppState>>) -> Response {
    match render_svg(&state.chart.current()) {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => {
            tracing::error!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn chart_json(State(state): State<Arc<AppState>>) -> Json<ChartSnapshot> {
    Json(state.chart.current())
}

/// Re-rendered chart on connect and after every accepted reading
pub async fn chart_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.chart.subscribe();
    let mut stopped = state.stopped.clone();

    let stream = async_stream::stream! {
        loop {
            let rendered = render_svg(&rx.borrow_and_update());
            match rendered {
                // SSE data cannot carry carriage returns
                Ok(svg) => {
                    yield Ok::<_, Infallible>(Event::default().event("chart").data(svg.replace('\r', "")));
                }
                Err(e) => tracing::error!("{}", e),
            }

            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = async { let _ = stopped.wait_for(|stop| *stop).await; } => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
