mod chat;

pub use chat::chat_page;

/// Styling for the chat view, inlined so the page works offline.
pub(crate) const CSS: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: #0a0e1a; color: #d1d5db; height: 100vh; display: flex;
}
#sidebar {
    width: 230px; background: #111827; border-right: 1px solid #1f2937;
    padding: 16px; display: flex; flex-direction: column; gap: 8px;
}
#sidebar h1 { font-size: 16px; color: #e5e7eb; margin-bottom: 8px; }
.instance { padding: 8px; border-radius: 6px; background: #1f2937; font-size: 13px; }
.instance .role { color: #9ca3af; font-size: 11px; }
#main { flex: 1; display: flex; flex-direction: column; }
#messages { flex: 1; overflow-y: auto; padding: 16px; display: flex; flex-direction: column; gap: 8px; }
.msg { max-width: 70%; padding: 8px 12px; border-radius: 8px; background: #1f2937; font-size: 14px; }
.msg.mine { align-self: flex-end; background: #1d4ed8; color: #fff; }
.msg .meta { font-size: 11px; color: #9ca3af; margin-bottom: 2px; }
.msg.mine .meta { color: #bfdbfe; }
.msg.failed { opacity: 0.6; border: 1px dashed #ef4444; }
#composer { display: flex; gap: 8px; padding: 12px 16px; border-top: 1px solid #1f2937; }
#composer select, #composer input, #composer button {
    background: #1f2937; color: #e5e7eb; border: 1px solid #374151;
    border-radius: 6px; padding: 8px; font-size: 14px;
}
#composer input { flex: 1; }
#composer button { cursor: pointer; background: #1d4ed8; border-color: #1d4ed8; }
#conn { font-size: 12px; color: #9ca3af; padding: 8px 16px; border-bottom: 1px solid #1f2937; }
#conn.up { color: #34d399; }
"#;
