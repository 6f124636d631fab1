//! Private-chat command protocol.
//!
//! Commands mutate the subscription store and reply over the transport.
//! The dispatcher is stateless between invocations; everything it needs
//! lives in the store.

use crate::error::Result;
use crate::store::SubscriptionStore;
use crate::transport::{SendOptions, Transport};
use crate::types::{ChatKind, ChatMessage, SubscriberId};
use tracing::{debug, warn};

/// Version reported by `/start` and `/versao`.
pub const BOT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A recognized private-chat command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    /// `/apagartudo`
    ClearAll,
    /// `/add` with its argument, which may be empty.
    Add(String),
    /// `/lista`
    List,
    /// `/apagar`, with or without an argument.
    Remove(Option<String>),
    /// `/doar`
    Donate,
    /// `/versao`
    Version,
}

impl Command {
    /// Parse trimmed message text. Matched in priority order: the exact
    /// commands first, then the prefix commands, whose argument is
    /// everything after the command token, trimmed and lowercased. Unknown
    /// text yields `None`.
    pub fn parse(text: &str) -> Option<Command> {
        if text == "/start" {
            Some(Command::Start)
        } else if text == "/apagartudo" {
            Some(Command::ClearAll)
        } else if let Some(rest) = text.strip_prefix("/add") {
            Some(Command::Add(normalize_argument(rest)))
        } else if text == "/lista" {
            Some(Command::List)
        } else if let Some(rest) = text.strip_prefix("/apagar") {
            let argument = normalize_argument(rest);
            if argument.is_empty() {
                Some(Command::Remove(None))
            } else {
                Some(Command::Remove(Some(argument)))
            }
        } else if text == "/doar" {
            Some(Command::Donate)
        } else if text == "/versao" {
            Some(Command::Version)
        } else {
            None
        }
    }
}

fn normalize_argument(rest: &str) -> String {
    rest.trim().to_lowercase()
}

/// Handle one incoming chat message end to end.
///
/// Messages outside a private chat, and empty texts, are ignored entirely.
/// The subscriber entry is created implicitly for any non-empty private
/// message, command or not. A failed reply is logged and swallowed; it
/// never affects the rest of the batch.
pub fn dispatch<T: Transport>(
    message: &ChatMessage,
    store: &mut SubscriptionStore,
    transport: &T,
) {
    if message.kind != ChatKind::Private {
        return;
    }
    let text = match message.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return,
    };

    let chat = message.chat;
    store.ensure_subscriber(chat);

    let command = match Command::parse(text) {
        Some(command) => command,
        None => return,
    };
    debug!("command from {}: {:?}", chat, command);

    let outcome = execute(command, chat, store, transport);
    if let Err(e) = outcome {
        warn!("failed to reply to {}: {}", chat, e);
    }
}

fn execute<T: Transport>(
    command: Command,
    chat: SubscriberId,
    store: &mut SubscriptionStore,
    transport: &T,
) -> Result<()> {
    match command {
        Command::Start => {
            transport.send_message(chat, &replies::welcome(), SendOptions::markdown())
        }
        Command::ClearAll => {
            store.clear_all(chat);
            transport.send_message(chat, replies::CLEARED_ALL, SendOptions::default())
        }
        Command::Add(keyword) => {
            if keyword.is_empty() {
                transport.send_message(chat, replies::ADD_USAGE, SendOptions::markdown())
            } else {
                store.add(chat, &keyword);
                transport.send_message(
                    chat,
                    &replies::keyword_added(&keyword),
                    SendOptions::markdown(),
                )
            }
        }
        Command::List => {
            let keywords = store.keywords(chat);
            if keywords.is_empty() {
                transport.send_message(chat, replies::NO_KEYWORDS, SendOptions::default())
            } else {
                transport.send_message(
                    chat,
                    &replies::keyword_list(&keywords),
                    SendOptions::default(),
                )
            }
        }
        Command::Remove(argument) => {
            let keywords = store.keywords(chat);
            if keywords.is_empty() {
                return transport.send_message(
                    chat,
                    replies::NOTHING_TO_DELETE,
                    SendOptions::default(),
                );
            }
            match argument {
                None => transport.send_message(
                    chat,
                    &replies::remove_usage(&keywords),
                    SendOptions::markdown(),
                ),
                Some(keyword) => {
                    if store.remove(chat, &keyword) {
                        transport.send_message(
                            chat,
                            &replies::keyword_removed(&keyword),
                            SendOptions::markdown(),
                        )
                    } else {
                        transport.send_message(chat, replies::NOT_FOUND, SendOptions::default())
                    }
                }
            }
        }
        Command::Donate => transport.send_message(chat, replies::DONATE, SendOptions::markdown()),
        Command::Version => {
            transport.send_message(chat, &replies::version(), SendOptions::markdown())
        }
    }
}

/// User-facing reply templates.
pub mod replies {
    use super::BOT_VERSION;

    pub const CLEARED_ALL: &str = "🧹 Todas as palavras foram removidas da sua lista.";
    pub const NO_KEYWORDS: &str = "📭 Nenhuma palavra cadastrada.";
    pub const NOTHING_TO_DELETE: &str = "📭 Você não tem palavras cadastradas para apagar.";
    pub const NOT_FOUND: &str = "⚠️ Palavra não encontrada.";
    pub const ADD_USAGE: &str = "⚠️ Use `/add palavra` para adicionar uma palavra-chave.";
    pub const DONATE: &str = "☕ Quer apoiar o projeto?\n\n✨ *Chave PIX:* `lamorimverso@gmail.com`\n\nMuito obrigado pelo apoio! ❤️";

    pub fn welcome() -> String {
        format!(
            "📢 *Bem-vindo ao Lamorim das Promoções Avisos!*\n\n\
             Versão atual: *{BOT_VERSION}*\n\n\
             Aqui você pode cadastrar palavras-chave para receber alertas de ofertas.\n\n\
             📝 `/add` — Adicionar palavra-chave\n\
             📋 `/lista` — Ver suas palavras cadastradas\n\
             🗑 `/apagar` — Remover uma palavra\n\
             😱 `/apagartudo` — Remover todas as palavras\n\
             ☕ `/doar` — Ajude o projeto\n\
             🆙 `/versao` — Mostrar a versão atual do bot\n\n\
             Para começar, use `/add desconto` para cadastrar a palavra *desconto*."
        )
    }

    pub fn keyword_added(keyword: &str) -> String {
        format!("✅ Palavra adicionada: *{keyword}*")
    }

    pub fn keyword_removed(keyword: &str) -> String {
        format!("🗑 Removida: *{keyword}*")
    }

    pub fn keyword_list(keywords: &[String]) -> String {
        let lines: Vec<String> = keywords.iter().map(|k| format!("• {k}")).collect();
        format!("📋 Suas palavras cadastradas:\n{}", lines.join("\n"))
    }

    pub fn remove_usage(keywords: &[String]) -> String {
        let lines: Vec<String> = keywords.iter().map(|k| format!("• `/apagar {k}`")).collect();
        format!(
            "🗑 Para apagar, use `/apagar palavra`\n\nSuas palavras:\n{}",
            lines.join("\n")
        )
    }

    pub fn version() -> String {
        format!("🤖 Versão atual do bot: *{BOT_VERSION}*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cursor, MessageId, SourceId, Update};
    use std::cell::RefCell;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingTransport {
        sent: RefCell<Vec<(SubscriberId, String)>>,
    }

    impl Transport for RecordingTransport {
        fn fetch_updates(&self, _cursor: Cursor, _timeout: Duration) -> Result<Vec<Update>> {
            Ok(Vec::new())
        }

        fn forward_message(
            &self,
            _to: SubscriberId,
            _from: SourceId,
            _message: MessageId,
        ) -> Result<()> {
            Ok(())
        }

        fn send_message(&self, to: SubscriberId, text: &str, _options: SendOptions) -> Result<()> {
            self.sent.borrow_mut().push((to, text.to_string()));
            Ok(())
        }
    }

    fn test_store(dir: &TempDir) -> SubscriptionStore {
        SubscriptionStore::open(dir.path().join("snapshot.json")).unwrap()
    }

    fn private(chat: i64, text: &str) -> ChatMessage {
        ChatMessage {
            chat: SubscriberId(chat),
            kind: ChatKind::Private,
            text: Some(text.to_string()),
        }
    }

    // --- Parsing ---

    #[test]
    fn test_parse_exact_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/apagartudo"), Some(Command::ClearAll));
        assert_eq!(Command::parse("/lista"), Some(Command::List));
        assert_eq!(Command::parse("/doar"), Some(Command::Donate));
        assert_eq!(Command::parse("/versao"), Some(Command::Version));
    }

    #[test]
    fn test_parse_add_argument_is_trimmed_and_lowercased() {
        assert_eq!(
            Command::parse("/add  Cupom Shopee "),
            Some(Command::Add("cupom shopee".to_string()))
        );
    }

    #[test]
    fn test_parse_add_without_argument() {
        assert_eq!(Command::parse("/add"), Some(Command::Add(String::new())));
    }

    #[test]
    fn test_parse_apagartudo_takes_priority_over_apagar() {
        // "/apagartudo" also starts with "/apagar"; the exact command wins
        assert_eq!(Command::parse("/apagartudo"), Some(Command::ClearAll));
        assert_eq!(
            Command::parse("/apagar tudo"),
            Some(Command::Remove(Some("tudo".to_string())))
        );
    }

    #[test]
    fn test_parse_apagar_with_and_without_argument() {
        assert_eq!(Command::parse("/apagar"), Some(Command::Remove(None)));
        assert_eq!(
            Command::parse("/apagar Promo"),
            Some(Command::Remove(Some("promo".to_string())))
        );
    }

    #[test]
    fn test_parse_unknown_text() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/unknown"), None);
    }

    // --- Dispatch ---

    #[test]
    fn test_add_then_list() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "/add Desconto"), &mut store, &transport);
        dispatch(&private(1, "/lista"), &mut store, &transport);

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, replies::keyword_added("desconto"));
        assert_eq!(sent[1].1, replies::keyword_list(&["desconto".to_string()]));
    }

    #[test]
    fn test_add_without_argument_replies_usage_and_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "/add"), &mut store, &transport);

        assert_eq!(store.keywords(SubscriberId(1)), Vec::<String>::new());
        let sent = transport.sent.borrow();
        assert_eq!(sent[0].1, replies::ADD_USAGE);
    }

    #[test]
    fn test_clear_all_replies_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "/add a"), &mut store, &transport);
        dispatch(&private(1, "/add b"), &mut store, &transport);
        dispatch(&private(1, "/apagartudo"), &mut store, &transport);
        dispatch(&private(1, "/lista"), &mut store, &transport);

        let sent = transport.sent.borrow();
        assert_eq!(sent[2].1, replies::CLEARED_ALL);
        assert_eq!(sent[3].1, replies::NO_KEYWORDS);
    }

    #[test]
    fn test_remove_without_argument_lists_removable_keywords() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "/add b"), &mut store, &transport);
        dispatch(&private(1, "/add a"), &mut store, &transport);
        dispatch(&private(1, "/apagar"), &mut store, &transport);

        let sent = transport.sent.borrow();
        assert_eq!(
            sent[2].1,
            replies::remove_usage(&["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_remove_with_empty_set_replies_nothing_to_delete() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "/apagar"), &mut store, &transport);
        dispatch(&private(1, "/apagar promo"), &mut store, &transport);

        let sent = transport.sent.borrow();
        assert_eq!(sent[0].1, replies::NOTHING_TO_DELETE);
        assert_eq!(sent[1].1, replies::NOTHING_TO_DELETE);
    }

    #[test]
    fn test_remove_absent_keyword_replies_not_found() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "/add promo"), &mut store, &transport);
        dispatch(&private(1, "/apagar desconto"), &mut store, &transport);

        let sent = transport.sent.borrow();
        assert_eq!(sent[1].1, replies::NOT_FOUND);
        assert_eq!(store.keywords(SubscriberId(1)), vec!["promo"]);
    }

    #[test]
    fn test_non_private_chat_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        let message = ChatMessage {
            chat: SubscriberId(1),
            kind: ChatKind::Group,
            text: Some("/add promo".to_string()),
        };
        dispatch(&message, &mut store, &transport);

        assert_eq!(store.subscriber_count(), 0);
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn test_unknown_text_is_silently_ignored_but_creates_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "oi, tudo bem?"), &mut store, &transport);

        assert!(transport.sent.borrow().is_empty());
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn test_empty_text_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "   "), &mut store, &transport);
        let message = ChatMessage {
            chat: SubscriberId(1),
            kind: ChatKind::Private,
            text: None,
        };
        dispatch(&message, &mut store, &transport);

        assert!(transport.sent.borrow().is_empty());
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_version_reply_names_the_package_version() {
        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);
        let transport = RecordingTransport::default();

        dispatch(&private(1, "/versao"), &mut store, &transport);

        let sent = transport.sent.borrow();
        assert!(sent[0].1.contains(BOT_VERSION));
    }

    #[test]
    fn test_failed_reply_is_swallowed() {
        struct FailingTransport;

        impl Transport for FailingTransport {
            fn fetch_updates(&self, _: Cursor, _: Duration) -> Result<Vec<Update>> {
                Ok(Vec::new())
            }
            fn forward_message(&self, _: SubscriberId, _: SourceId, _: MessageId) -> Result<()> {
                Ok(())
            }
            fn send_message(&self, _: SubscriberId, _: &str, _: SendOptions) -> Result<()> {
                Err(crate::error::RelayError::Transport("down".to_string()))
            }
        }

        let dir = TempDir::new().unwrap();
        let mut store = test_store(&dir);

        // must not panic, and the mutation must still land
        dispatch(&private(1, "/add promo"), &mut store, &FailingTransport);
        assert_eq!(store.keywords(SubscriberId(1)), vec!["promo"]);
    }
}
