use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Derives a URL-safe slug: lowercase ASCII letters and digits, any other run
/// of characters collapsed into a single `-`, trimmed, cut to `max_len`.
///
/// Accented letters lose their marks (`Zażółć` becomes `zazolc`), letters
/// without a decomposition are folded by hand (`Ł` becomes `l`), and `+`/`#`
/// are spelled out so `C++` and `C#` keep distinct slugs.
///
/// Returns an empty string when the input has nothing slug-worthy in it;
/// callers treat that as a validation failure.
pub fn slugify(input: &str, max_len: usize) -> String {
    let mut slug = Slug::with_capacity(input.len());

    for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase().encode_utf8(&mut [0; 4]));
        } else if let Some(letters) = folded_letter(c) {
            slug.push(letters);
        } else if let Some(word) = spelled_symbol(c) {
            slug.separate();
            slug.push(word);
            slug.separate();
        } else {
            slug.separate();
        }
    }

    slug.finish(max_len)
}

fn folded_letter(c: char) -> Option<&'static str> {
    let letters = match c {
        'ł' | 'Ł' => "l",
        'đ' | 'Đ' | 'ð' | 'Ð' => "d",
        'ø' | 'Ø' => "o",
        'ı' => "i",
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'þ' | 'Þ' => "th",
        _ => return None,
    };
    Some(letters)
}

fn spelled_symbol(c: char) -> Option<&'static str> {
    match c {
        '+' => Some("plus"),
        '#' => Some("sharp"),
        _ => None,
    }
}

struct Slug {
    out: String,
    pending_dash: bool,
}

impl Slug {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            pending_dash: false,
        }
    }

    fn push(&mut self, part: &str) {
        if self.pending_dash && !self.out.is_empty() {
            self.out.push('-');
        }
        self.pending_dash = false;
        self.out.push_str(part);
    }

    fn separate(&mut self) {
        self.pending_dash = true;
    }

    // Output is pure ASCII, so byte truncation is safe.
    fn finish(mut self, max_len: usize) -> String {
        if self.out.len() > max_len {
            self.out.truncate(max_len);
            while self.out.ends_with('-') {
                self.out.pop();
            }
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_separators() {
        assert_eq!(slugify("  Rust -- Async   IO ", 32), "rust-async-io");
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(slugify("HTTP/2 Frames", 32), "http-2-frames");
    }

    #[test]
    fn truncates_without_trailing_dash() {
        assert_eq!(slugify("abcd efgh", 5), "abcd");
    }

    #[test]
    fn nothing_usable() {
        assert_eq!(slugify("???", 32), "");
        assert_eq!(slugify("*** ... ***", 32), "");
    }

    #[test]
    fn transliterates_polish() {
        assert_eq!(slugify("Łódź", 32), "lodz");
        assert_eq!(slugify("Żaba", 32), "zaba");
        assert_eq!(slugify("Zażółć gęślą jaźń", 64), "zazolc-gesla-jazn");
        assert_eq!(slugify("ćma", 32), "cma");
        assert_eq!(slugify("Łma", 32), "lma");
    }

    #[test]
    fn folds_other_latin_letters() {
        assert_eq!(slugify("Straße Øresund", 32), "strasse-oresund");
        assert_eq!(slugify("Ｒｕｓｔ", 32), "rust");
    }

    #[test]
    fn spells_out_plus_and_sharp() {
        assert_eq!(slugify("C++", 32), "c-plus-plus");
        assert_eq!(slugify("C#", 32), "c-sharp");
        assert_eq!(slugify("C##", 32), "c-sharp-sharp");
        assert_eq!(slugify("+++", 32), "plus-plus-plus");
    }

    #[test]
    fn non_latin_scripts_are_separators() {
        assert_eq!(slugify("Rust 日本", 32), "rust");
    }
}
