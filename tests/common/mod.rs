//! Shared helpers for the HTTP integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use poultry_vet_chat::{
    api::{self, build_router},
    chat::{prompt::ChatMessage, ChatCompletion, LlmError},
    config::Config,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const BOUNDARY: &str = "----poultryvetboundary7MA4YWxk";

/// Completion backend that records requests and numbers its replies
#[derive(Default)]
pub struct StubLlm {
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubLlm {
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Vec<ChatMessage> {
        self.calls().pop().expect("no upstream call recorded")
    }
}

#[async_trait]
impl ChatCompletion for StubLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(messages.to_vec());
        Ok(format!("stub reply {}", calls.len()))
    }
}

pub fn app_with(llm: Arc<dyn ChatCompletion>) -> Router {
    app_with_config(llm, &Config::default())
}

pub fn app_with_config(llm: Arc<dyn ChatCompletion>, config: &Config) -> Router {
    let state = api::app_state_with(llm, config);
    build_router(state, &config.server, &config.cors)
}

pub enum Part {
    Text(&'static str, String),
    File(&'static str, &'static str, Vec<u8>),
}

pub fn text(name: &'static str, value: impl Into<String>) -> Part {
    Part::Text(name, value.into())
}

pub fn file(name: &'static str, filename: &'static str, data: Vec<u8>) -> Part {
    Part::File(name, filename, data)
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, session: Option<&str>, parts: &[Part]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(session) = session {
        builder = builder.header("X-Session-Id", session);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn encode_image(format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([140, 110, 60])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// Minimal 1x1 24-bit BMP
pub fn bmp_image() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"BM");
    data.extend_from_slice(&58u32.to_le_bytes());
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(&54u32.to_le_bytes());
    data.extend_from_slice(&40u32.to_le_bytes());
    data.extend_from_slice(&1i32.to_le_bytes());
    data.extend_from_slice(&1i32.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&24u16.to_le_bytes());
    data.extend_from_slice(&[0u8; 24]);
    data.extend_from_slice(&[0, 0, 255, 0]);
    data
}
