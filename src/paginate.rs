//! Splits ordered item sequences into fixed-size pages.

/// One page of a paginated listing. `number` is 1-indexed.
#[derive(Debug, PartialEq)]
pub struct Pager<'a, T> {
    pub number: usize,
    pub total: usize,
    pub items: &'a [T],
}

impl<'a, T> Pager<'a, T> {
    pub fn prev(&self) -> Option<usize> {
        match self.number {
            1 => None,
            n => Some(n - 1),
        }
    }

    pub fn next(&self) -> Option<usize> {
        match self.number < self.total {
            true => Some(self.number + 1),
            false => None,
        }
    }
}

/// Splits `items` into pages of at most `page_size` items. Page `n` holds the
/// items at offsets `(n-1)*page_size` through `n*page_size - 1`. An empty
/// input still yields one (empty) page, so every listing has a first page to
/// render.
pub fn paginate<T>(items: &[T], page_size: usize) -> Vec<Pager<'_, T>> {
    let page_size = page_size.max(1);
    let total = match items.len() % page_size {
        0 => items.len() / page_size,
        _ => items.len() / page_size + 1,
    }
    .max(1);

    if items.is_empty() {
        return vec![Pager {
            number: 1,
            total,
            items,
        }];
    }

    items
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| Pager {
            number: i + 1,
            total,
            items: chunk,
        })
        .collect()
}

/// Returns the relative output directory of page `number` of a listing rooted
/// at `base` (which is empty or ends in `/`). The first page lives at the base
/// itself; later pages at `{base}page/{number}/`.
pub fn pager_path(base: &str, number: usize) -> String {
    match number {
        0 | 1 => base.to_owned(),
        n => format!("{}page/{}/", base, n),
    }
}
