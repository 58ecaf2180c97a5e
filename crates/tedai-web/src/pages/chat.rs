//! Chat Page

use leptos::html;
use leptos::prelude::*;

use crate::api::{self, ChatMessage, Sender};
use crate::components::{Header, MessageBubble, Thinking, Welcome};

#[component]
pub fn ChatPage() -> impl IntoView {
    let (messages, set_messages) = signal(Vec::<ChatMessage>::new());
    let (input, set_input) = signal(String::new());
    let (loading, set_loading) = signal(false);
    let (session_id, set_session_id) = signal(None::<String>);

    let end_ref = NodeRef::<html::Div>::new();
    let input_ref = NodeRef::<html::Input>::new();

    // Keep the newest message in view
    Effect::new(move |_| {
        messages.track();
        loading.track();
        if let Some(end) = end_ref.get() {
            end.scroll_into_view();
        }
    });

    // Focus the input on mount and whenever a request finishes
    Effect::new(move |_| {
        if !loading.get() {
            if let Some(input) = input_ref.get() {
                let _ = input.focus();
            }
        }
    });

    let push = move |sender: Sender, content: String| {
        set_messages.update(|msgs| {
            let id = msgs.len();
            msgs.push(ChatMessage {
                id,
                sender,
                content,
            });
        });
    };

    let send = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();

        let query = input.get().trim().to_string();
        if query.is_empty() || loading.get() {
            return;
        }

        push(Sender::User, query.clone());
        set_input.set(String::new());
        set_loading.set(true);

        let session = session_id.get_untracked();
        leptos::task::spawn_local(async move {
            match api::send_chat(&query, session.as_deref()).await {
                Ok(reply) => {
                    set_session_id.set(Some(reply.session_id));
                    push(Sender::Assistant, reply.response);
                }
                Err(e) => push(Sender::Error, format!("❌ Error: {e}")),
            }
            set_loading.set(false);
        });
    };

    let clear = move || {
        set_messages.set(Vec::new());
        set_input.set(String::new());
        if let Some(input) = input_ref.get_untracked() {
            let _ = input.focus();
        }

        let session = session_id.get_untracked();
        leptos::task::spawn_local(async move {
            if let Err(e) = api::clear_session(session.as_deref()).await {
                push(Sender::Error, format!("❌ Error: {e}"));
            }
        });
    };

    view! {
        <div class="chat-card">
            <Header on_clear=clear busy=loading />

            <div class="messages">
                <Show
                    when=move || !messages.with(Vec::is_empty)
                    fallback=move || view! { <Welcome set_input=set_input /> }
                >
                    <For
                        each=move || messages.get()
                        key=|msg| msg.id
                        children=move |msg| view! { <MessageBubble message=msg /> }
                    />
                </Show>
                <Show when=move || loading.get()>
                    <Thinking />
                </Show>
                <div node_ref=end_ref></div>
            </div>

            <form class="input-container" on:submit=send>
                <input
                    node_ref=input_ref
                    class="input-field"
                    type="text"
                    placeholder="Chat with TedAI..."
                    prop:value=move || input.get()
                    on:input=move |ev| set_input.set(event_target_value(&ev))
                    disabled=move || loading.get()
                />
                <button
                    type="submit"
                    class="send-button"
                    disabled=move || loading.get() || input.with(|text| text.trim().is_empty())
                >
                    "Send"
                </button>
            </form>

            <footer class="app-footer">
                <p>
                    "Built with " <span class="footer-heart">"♥"</span>
                    " Groq (Llama 3.1) & Tavily Real-Time Web Search"
                </p>
            </footer>
        </div>
    }
}
