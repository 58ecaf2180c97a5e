//! UI Components

use leptos::prelude::*;

use crate::api::{ChatMessage, Sender};

const SUGGESTIONS: [(&str, &str); 3] = [
    ("🤖", "What's the latest news in AI?"),
    ("💭", "Tell me something interesting"),
    ("👩🏻‍💻", "What's trending in tech today?"),
];

/// Title bar with the clear-chat action
#[component]
pub fn Header(on_clear: impl Fn() + Send + Sync + 'static, busy: ReadSignal<bool>) -> impl IntoView {
    view! {
        <header class="header">
            <div class="brand">
                <span class="logo">"🧸"</span>
                <div>
                    <h1>"TedAI"</h1>
                    <p class="tagline">"Autonomous Research Agent"</p>
                </div>
            </div>
            <button
                class="btn btn-ghost"
                title="Clear chat"
                disabled=move || busy.get()
                on:click=move |_| on_clear()
            >
                "Clear"
            </button>
        </header>
    }
}

/// Shown while the conversation is empty; pills prefill the input
#[component]
pub fn Welcome(set_input: WriteSignal<String>) -> impl IntoView {
    view! {
        <div class="welcome-container">
            <h2 class="welcome-title">"Hi! I'm TedAI"</h2>
            <p class="welcome-description">
                "I'm here to help you with anything you need. I can search the web, answer questions, and have friendly conversations. What would you like to talk about?"
            </p>
            <div class="suggestion-pills">
                {SUGGESTIONS
                    .into_iter()
                    .map(|(icon, text)| {
                        view! {
                            <button
                                class="suggestion-pill"
                                on:click=move |_| set_input.set(text.to_string())
                            >
                                {format!("{icon} {text}")}
                            </button>
                        }
                    })
                    .collect_view()}
            </div>
        </div>
    }
}

/// Message bubble component
#[component]
pub fn MessageBubble(message: ChatMessage) -> impl IntoView {
    let row = if message.sender == Sender::User {
        "message-row message-row-user"
    } else {
        "message-row"
    };
    let avatar = match message.sender {
        Sender::User => "👤",
        Sender::Assistant | Sender::Error => "🧸",
    };

    view! {
        <div class=row>
            <span class="avatar">{avatar}</span>
            <div class=format!("message-bubble {}", message.sender.class())>
                <p>{message.content}</p>
            </div>
        </div>
    }
}

/// Pending-request indicator
#[component]
pub fn Thinking() -> impl IntoView {
    view! {
        <div class="message-row">
            <span class="avatar">"🧸"</span>
            <div class="thinking-loader">
                <span class="dot"></span>
                <span class="dot"></span>
                <span class="dot"></span>
                <span>"TedAI is thinking..."</span>
            </div>
        </div>
    }
}
