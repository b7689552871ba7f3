use axum::response::IntoResponse;
use maud::{DOCTYPE, PreEscaped, html};

use super::CSS;

/// `GET /chat` — the browser client for the realtime channel.
///
/// Plain inline JS talking to `/ws`; renders the `init` snapshot, then
/// appends on every `new_message`. Sends go out as `send_message`
/// events with `from: "human"`.
pub async fn chat_page() -> impl IntoResponse {
    let markup = html! {
        (DOCTYPE)
        html {
            head {
                title { "Agent Relay - Chat" }
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                style { (PreEscaped(CSS)) }
            }
            body {
                div id="sidebar" {
                    h1 { "Agent Relay" }
                    div id="instances" {}
                }
                div id="main" {
                    div id="conn" { "connecting…" }
                    div id="messages" {}
                    form id="composer" {
                        select id="to" {
                            option value="main" { "main" }
                            option value="all" { "all" }
                        }
                        input id="content" type="text" autocomplete="off"
                            placeholder="Message an instance…";
                        button type="submit" { "Send" }
                    }
                }
                script { (PreEscaped(CHAT_JS)) }
            }
        }
    };
    markup.into_response()
}

const CHAT_JS: &str = r#"
const conn = document.getElementById('conn');
const list = document.getElementById('messages');
const instancesEl = document.getElementById('instances');
const toSelect = document.getElementById('to');

function renderInstances(instances) {
    instancesEl.innerHTML = '';
    const known = new Set(['main', 'all']);
    for (const inst of instances) {
        const div = document.createElement('div');
        div.className = 'instance';
        div.innerHTML = '<div>' + (inst.name || inst.id) +
            '</div><div class="role">' + inst.role + '</div>';
        instancesEl.appendChild(div);
        if (!known.has(inst.id)) {
            known.add(inst.id);
            const opt = document.createElement('option');
            opt.value = inst.id;
            opt.textContent = inst.name || inst.id;
            toSelect.appendChild(opt);
        }
    }
}

const seenIds = new Set();

function renderMessage(msg) {
    // init and a raced new_message can carry the same record
    if (seenIds.has(msg.id)) return;
    seenIds.add(msg.id);
    const div = document.createElement('div');
    div.className = 'msg' + (msg.from === 'human' ? ' mine' : '') +
        (msg.delivered ? '' : ' failed');
    const when = new Date(msg.timestamp).toLocaleTimeString();
    const meta = document.createElement('div');
    meta.className = 'meta';
    meta.textContent = msg.fromDisplayName + ' → ' + msg.toDisplayName + ' · ' + when;
    const body = document.createElement('div');
    body.textContent = msg.content;
    div.appendChild(meta);
    div.appendChild(body);
    list.appendChild(div);
    list.scrollTop = list.scrollHeight;
}

const proto = location.protocol === 'https:' ? 'wss:' : 'ws:';
const socket = new WebSocket(proto + '//' + location.host + '/ws');

socket.onopen = () => { conn.textContent = 'connected'; conn.className = 'up'; };
socket.onclose = () => { conn.textContent = 'disconnected - reload to reconnect'; conn.className = ''; };
socket.onmessage = (raw) => {
    const event = JSON.parse(raw.data);
    if (event.type === 'init') {
        renderInstances(event.instances);
        list.innerHTML = '';
        seenIds.clear();
        for (const msg of event.messages) renderMessage(msg);
    } else if (event.type === 'new_message') {
        renderMessage(event.message);
    }
};

document.getElementById('composer').addEventListener('submit', (e) => {
    e.preventDefault();
    const content = document.getElementById('content').value.trim();
    if (!content || socket.readyState !== WebSocket.OPEN) return;
    socket.send(JSON.stringify({
        type: 'send_message',
        from: 'human',
        to: toSelect.value,
        content,
    }));
    document.getElementById('content').value = '';
});
"#;
