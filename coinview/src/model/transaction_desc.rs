//! Human-readable descriptions of wallet transactions.

use bitcoin::address::NetworkUnchecked;
use bitcoin::absolute::LOCK_TIME_THRESHOLD;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{Address, SignedAmount};
use chrono::{DateTime, Utc};
use coinlink::{CreditFilter, WalletInterface, WalletTx};

use super::transaction_record::signed;
use super::transaction_status::{looks_offline, NUM_CONFIRMATIONS};
use super::units::Unit;

const MATURITY_NOTE: &str = "Generated coins must wait 120 blocks before they can be spent.  \
When you generated this block, it was broadcast to the network to be added to the block chain.  \
If it fails to get into the chain, it will change to \"not accepted\" and not be spendable.  \
This may occasionally happen if another node generates a block within a few seconds of yours.";

/// Unix time as `YYYY-MM-DD HH:MM` in UTC
pub fn date_time_str(time: i64) -> String {
    DateTime::<Utc>::from_timestamp(time, 0)
        .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub fn html_escape(text: &str, multi_line: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' if multi_line => escaped.push_str("<br>\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Short confirmation summary, as shown in a status column
pub fn format_tx_status<W: WalletInterface + ?Sized>(wallet: &W, wtx: &WalletTx) -> String {
    if !wallet.is_final(wtx) {
        let lock_time = wtx.lock_time();
        if lock_time < LOCK_TIME_THRESHOLD {
            let remaining = i64::from(lock_time) - i64::from(wallet.best_height());
            return format!("Open for {} blocks", remaining);
        }
        return format!("Open until {}", date_time_str(i64::from(lock_time)));
    }

    let depth = wallet.depth_in_main_chain(wtx);
    if looks_offline(wallet, wtx) {
        format!("{}/offline?", depth)
    } else if depth < NUM_CONFIRMATIONS {
        format!("{}/unconfirmed", depth)
    } else {
        format!("{} confirmations", depth)
    }
}

fn btc(amount: SignedAmount, plus_sign: bool) -> String {
    Unit::Btc.format_amount(amount, plus_sign)
}

/// Address-book label for `address`, when it has a non-empty one
fn label_of<W: WalletInterface + ?Sized>(wallet: &W, address: &Address) -> Option<String> {
    wallet.address_label(address).filter(|label| !label.is_empty())
}

/// Full HTML details page for `wtx`; `debug` appends the raw transaction
/// and every input's origin.
pub fn to_html<W: WalletInterface + ?Sized>(wallet: &W, wtx: &WalletTx, debug: bool) -> String {
    let mut html = String::with_capacity(4000);
    html.push_str("<html><font face='verdana, arial, helvetica, sans-serif'>");

    let time = wtx.tx_time();
    let credit = signed(wallet.credit(wtx, CreditFilter::Mature));
    let debit = signed(wallet.debit(wtx));
    let net = credit - debit;

    html.push_str("<b>Status:</b> ");
    html.push_str(&format_tx_status(wallet, wtx));
    match wallet.request_count(wtx) {
        Some(0) => html.push_str(", has not been successfully broadcast yet"),
        Some(1) => html.push_str(", broadcast through 1 node"),
        Some(n) => html.push_str(&format!(", broadcast through {} nodes", n)),
        None => {}
    }
    html.push_str("<br>");

    html.push_str("<b>Date:</b> ");
    if time != 0 {
        html.push_str(&date_time_str(time));
    }
    html.push_str("<br>");

    // Source
    let from = wtx.annotation("from");
    if wtx.is_coinbase() {
        html.push_str("<b>Source:</b> Generated<br>");
    } else if !from.is_empty() {
        html.push_str(&format!("<b>From:</b> {}<br>", html_escape(from, false)));
    } else if net > SignedAmount::ZERO {
        // Only the first owned output says anything about who received it
        if let Some(txout) = wtx.tx.output.iter().find(|txout| wallet.is_mine_output(txout)) {
            let address = wallet
                .address_of(&txout.script_pubkey)
                .filter(|address| wallet.have_key(address));
            if let Some(address) = address {
                if let Some(label) = wallet.address_label(&address) {
                    html.push_str("<b>From:</b> unknown<br>");
                    html.push_str("<b>To:</b> ");
                    html.push_str(&html_escape(&address.to_string(), false));
                    if label.is_empty() {
                        html.push_str(" (yours)");
                    } else {
                        html.push_str(&format!(" (yours, label: {})", html_escape(&label, false)));
                    }
                    html.push_str("<br>");
                }
            }
        }
    }

    // Recipient
    let to = wtx.annotation("to");
    if !to.is_empty() {
        html.push_str("<b>To:</b> ");
        let label = to
            .parse::<Address<NetworkUnchecked>>()
            .ok()
            .and_then(|address| address.require_network(wallet.network()).ok())
            .and_then(|address| label_of(wallet, &address));
        if let Some(label) = label {
            html.push_str(&html_escape(&label, false));
            html.push(' ');
        }
        html.push_str(&html_escape(to, false));
        html.push_str("<br>");
    }

    // Amount
    if wtx.is_coinbase() && credit == SignedAmount::ZERO {
        let unmatured: SignedAmount = wtx
            .tx
            .output
            .iter()
            .map(|txout| signed(wallet.output_credit(txout)))
            .sum();
        html.push_str("<b>Credit:</b> ");
        if wallet.is_in_main_chain(wtx) {
            html.push_str(&format!(
                "({} matures in {} more blocks)",
                btc(unmatured, false),
                wallet.blocks_to_maturity(wtx)
            ));
        } else {
            html.push_str("(not accepted)");
        }
        html.push_str("<br>");
    } else if net > SignedAmount::ZERO {
        html.push_str(&format!("<b>Credit:</b> {}<br>", btc(net, false)));
    } else {
        let all_from_me = wtx.tx.input.iter().all(|txin| wallet.is_mine_input(txin));
        let all_to_me = wtx.tx.output.iter().all(|txout| wallet.is_mine_output(txout));

        if all_from_me {
            for txout in wtx.tx.output.iter() {
                if wallet.is_mine_output(txout) {
                    continue;
                }
                if to.is_empty() {
                    if let Some(address) = wallet.address_of(&txout.script_pubkey) {
                        html.push_str("<b>To:</b> ");
                        if let Some(label) = label_of(wallet, &address) {
                            html.push_str(&html_escape(&label, false));
                            html.push(' ');
                        }
                        html.push_str(&html_escape(&address.to_string(), false));
                        html.push_str("<br>");
                    }
                }
                html.push_str(&format!("<b>Debit:</b> {}<br>", btc(-signed(txout.value), false)));
            }

            if all_to_me {
                let value = credit - signed(wallet.change(wtx));
                html.push_str(&format!("<b>Debit:</b> {}<br>", btc(-value, false)));
                html.push_str(&format!("<b>Credit:</b> {}<br>", btc(value, false)));
            }

            let fee = debit - signed(wtx.value_out());
            if fee > SignedAmount::ZERO {
                html.push_str(&format!("<b>Transaction fee:</b> {}<br>", btc(-fee, false)));
            }
        } else {
            push_owned_amounts(&mut html, wallet, wtx);
        }
    }

    html.push_str(&format!("<b>Net amount:</b> {}<br>", btc(net, true)));

    let message = wtx.annotation("message");
    if !message.is_empty() {
        html.push_str(&format!("<br><b>Message:</b><br>{}<br>", html_escape(message, true)));
    }
    let comment = wtx.annotation("comment");
    if !comment.is_empty() {
        html.push_str(&format!("<br><b>Comment:</b><br>{}<br>", html_escape(comment, true)));
    }

    html.push_str(&format!("<b>Transaction ID:</b> {}<br>", wtx.txid()));

    if wtx.is_coinbase() {
        html.push_str(&format!("<br>{}<br>", MATURITY_NOTE));
    }

    if debug {
        push_debug_section(&mut html, wallet, wtx);
    }

    html.push_str("</font></html>");
    html
}

/// Per-input debits and per-output credits that belong to the wallet
fn push_owned_amounts<W: WalletInterface + ?Sized>(html: &mut String, wallet: &W, wtx: &WalletTx) {
    for txin in wtx.tx.input.iter() {
        if wallet.is_mine_input(txin) {
            let debit = signed(wallet.input_debit(txin));
            html.push_str(&format!("<b>Debit:</b> {}<br>", btc(-debit, false)));
        }
    }
    for txout in wtx.tx.output.iter() {
        if wallet.is_mine_output(txout) {
            let credit = signed(wallet.output_credit(txout));
            html.push_str(&format!("<b>Credit:</b> {}<br>", btc(credit, false)));
        }
    }
}

fn push_debug_section<W: WalletInterface + ?Sized>(html: &mut String, wallet: &W, wtx: &WalletTx) {
    html.push_str("<hr><br>Debug information<br><br>");
    push_owned_amounts(html, wallet, wtx);

    html.push_str("<br><b>Transaction:</b><br>");
    html.push_str(&html_escape(&serialize_hex(&*wtx.tx), true));

    html.push_str("<br><b>Inputs:</b><ul>");
    for txin in wtx.tx.input.iter() {
        let Some(prevout) = wallet.previous_output(txin) else {
            continue;
        };
        html.push_str("<li>");
        if let Some(address) = wallet.address_of(&prevout.script_pubkey) {
            if let Some(label) = label_of(wallet, &address) {
                html.push_str(&html_escape(&label, false));
                html.push(' ');
            }
            html.push_str(&address.to_string());
        }
        html.push_str(&format!(
            " Amount={} IsMine={}</li>",
            btc(signed(prevout.value), false),
            wallet.is_mine_output(&prevout)
        ));
    }
    html.push_str("</ul>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{Network, OutPoint};
    use coinlink::memory::{fixtures, MemoryWallet};

    #[test]
    fn escapes_markup() {
        assert_eq!(html_escape("<b>&\"x\"</b>", false), "&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;");
        assert_eq!(html_escape("a\nb", true), "a<br>\nb");
        assert_eq!(html_escape("a\nb", false), "a\nb");
    }

    #[test]
    fn date_is_rendered_in_utc() {
        assert_eq!(date_time_str(0), "1970-01-01 00:00");
        assert_eq!(date_time_str(1_700_000_000), "2023-11-14 22:13");
    }

    #[test]
    fn status_strings() {
        let mut wallet = MemoryWallet::new(Network::Regtest);
        let block = fixtures::block_hash(1);
        wallet.add_block(block, 10);
        let tx = fixtures::spend(&[fixtures::outpoint(1, 0)], &[(fixtures::script(1), 1_000)]);
        let wtx = WalletTx::new(tx.clone(), 0).in_block(block);

        assert_eq!(format_tx_status(&wallet, &wtx), "1/unconfirmed");
        wallet.set_best_height(20);
        assert_eq!(format_tx_status(&wallet, &wtx), "11 confirmations");

        let pending = WalletTx::new(tx, 0);
        wallet.set_request_count(pending.txid(), 0);
        wallet.set_adjusted_time(1_000);
        assert_eq!(format_tx_status(&wallet, &pending), "0/offline?");

        let locked = WalletTx::new(fixtures::locked(
            fixtures::spend(&[fixtures::outpoint(2, 0)], &[(fixtures::script(1), 1_000)]),
            25,
        ), 0);
        assert_eq!(format_tx_status(&wallet, &locked), "Open for 5 blocks");
    }

    #[test]
    fn payment_page_lists_recipients_and_fee() {
        let mut wallet = MemoryWallet::new(Network::Regtest);
        let mine = fixtures::script(1);
        wallet.add_script(mine.clone());
        let funding = wallet.add_foreign_transaction(fixtures::spend(
            &[fixtures::outpoint(9, 0)],
            &[(mine, 100_000_000)],
        ));
        let payee = fixtures::script(2);
        let payee_address = wallet.address_of(&payee).unwrap();
        wallet.set_label(&payee_address, "Bob <shop>");

        let tx = fixtures::spend(&[OutPoint::new(funding, 0)], &[(payee, 90_000_000)]);
        let wtx = WalletTx::new(tx, 0).with_annotation("message", "rent\nMarch");
        let html = to_html(&wallet, &wtx, false);

        assert!(html.contains(&format!("<b>To:</b> Bob &lt;shop&gt; {}<br>", payee_address)));
        assert!(html.contains("<b>Debit:</b> -0.90 BTC<br>"));
        assert!(html.contains("<b>Transaction fee:</b> -0.10 BTC<br>"));
        assert!(html.contains("<b>Net amount:</b> -1.00 BTC<br>"));
        assert!(html.contains("<b>Message:</b><br>rent<br>\nMarch<br>"));
        assert!(html.contains(&wtx.txid().to_string()));
        assert!(!html.contains("Debug information"));
    }

    #[test]
    fn receive_page_names_own_address() {
        let mut wallet = MemoryWallet::new(Network::Regtest);
        let mine = fixtures::script(1);
        wallet.add_script(mine.clone());
        let address = wallet.address_of(&mine).unwrap();
        wallet.set_label(&address, "savings");

        let tx = fixtures::spend(&[fixtures::outpoint(9, 0)], &[(mine, 250_000_000)]);
        let wtx = WalletTx::new(tx, 1_700_000_000);
        wallet.set_request_count(wtx.txid(), 3);
        let html = to_html(&wallet, &wtx, true);

        assert!(html.contains(", broadcast through 3 nodes"));
        assert!(html.contains("<b>Date:</b> 2023-11-14 22:13<br>"));
        assert!(html.contains("<b>From:</b> unknown<br>"));
        assert!(html.contains(&format!("{} (yours, label: savings)", address)));
        assert!(html.contains("<b>Credit:</b> 2.50 BTC<br>"));
        assert!(html.contains("<b>Net amount:</b> +2.50 BTC<br>"));
        assert!(html.contains("Debug information"));
    }

    #[test]
    fn immature_coinbase_page() {
        let mut wallet = MemoryWallet::new(Network::Regtest);
        let mine = fixtures::script(1);
        wallet.add_script(mine.clone());
        let block = fixtures::block_hash(3);
        wallet.add_block(block, 10);
        wallet.set_best_height(19);

        let wtx = WalletTx::new(fixtures::coinbase(&[(mine, 5_000_000_000)]), 0).in_block(block);
        let html = to_html(&wallet, &wtx, false);

        assert!(html.contains("<b>Source:</b> Generated<br>"));
        assert!(html.contains("(50.00 BTC matures in 110 more blocks)"));
        assert!(html.contains("Generated coins must wait 120 blocks"));

        wallet.remove_block(&block);
        assert!(to_html(&wallet, &wtx, false).contains("(not accepted)"));
    }
}
