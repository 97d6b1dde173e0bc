use std::sync::Arc;

use lm_trie_core::{LogMath, Trie};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Load the model from "./data/sample.arpa"
    // A "./data/sample.bin" snapshot is written on first load and reused afterwards
    let lmath = Arc::new(LogMath::default());
    let trie = Trie::open("./data/sample.arpa", lmath)?;

    // Declared counts come from the \data\ header, live counts from the trie itself
    println!("Order: {}", trie.order());
    println!("Declared counts: {:?}", trie.counts().iter().skip(1).collect::<Vec<_>>());
    println!("Live counts: {:?}", trie.ngram_counts().iter().skip(1).collect::<Vec<_>>());

    // The vocabulary was built from the unigram section, ids in file order
    let vocab: Vec<&str> = trie.dict().words().map(|(_, w)| w).collect();
    println!("Vocabulary ({} words): {}", vocab.len(), vocab.join(" "));

    // Probabilities are integer logs; convert them back to log10 for display
    // History is given most recent word first
    let lmath = trie.lmath();
    for (word, history) in [
        ("sat", &["cat", "the"][..]),
        ("sat", &["dog", "the"][..]),
        ("</s>", &["sat"][..]),
        ("unicorn", &[][..]),
    ] {
        let (prob, n_used) = trie.prob_words(word, history);
        println!(
            "P({} | {}) = {:.4} (from a {}-gram)",
            word,
            history.iter().rev().copied().collect::<Vec<_>>().join(" "),
            lmath.log_to_log10(prob),
            n_used
        );
    }

    // Scoring a whole sentence sums the score of every token
    for sentence in ["<s> the cat sat </s>", "<s> a cat sat </s>", "<s> sat the </s>"] {
        let tokens: Vec<&str> = sentence.split_whitespace().collect();
        println!("{:<24} {:.4}", sentence, lmath.log_to_log10(trie.score_sentence(&tokens)));
    }

    // Flat iteration: every bigram in sorted order
    for id in trie.ngrams(2) {
        let words: Vec<&str> = trie.words(id).into_iter().filter_map(|w| trie.dict().word_str(w)).collect();
        let prob = trie.node_prob(id).unwrap_or(trie.floor());
        println!("{:.4}\t{}", lmath.log_to_log10(prob), words.join(" "));
    }

    // Local iteration: what may follow "the"
    if let Some(the) = trie.ngram_words("the", &[]) {
        for id in trie.successors(the) {
            if let Some(node) = trie.node(id) {
                println!("the -> {}", trie.dict().word_str(node.word()).unwrap_or("?"));
            }
        }
    }

    // Write the model back as ARPA text
    trie.write_arpa_file("./data/sample.out.arpa")?;
    println!("Model written to ./data/sample.out.arpa");

    Ok(())
}
