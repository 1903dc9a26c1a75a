//! Reconstruction of the 54-facelet string from packed permutation and
//! orientation arrays, plus the parity step that recovers the one corner and
//! one edge every generation omits from the wire.

/// Facelet indices per corner sticker, one triple per corner position.
pub const CORNER_MAP: [[usize; 3]; 8] = [
    [8, 9, 20],
    [6, 18, 38],
    [0, 36, 47],
    [2, 45, 11],
    [29, 26, 15],
    [27, 44, 24],
    [33, 53, 42],
    [35, 17, 51],
];

/// Facelet indices per edge sticker, one pair per edge position.
pub const EDGE_MAP: [[usize; 2]; 12] = [
    [5, 10],
    [7, 19],
    [3, 37],
    [1, 46],
    [32, 16],
    [28, 25],
    [30, 43],
    [34, 52],
    [23, 12],
    [21, 41],
    [50, 39],
    [48, 14],
];

const FACE_LETTERS: [char; 6] = ['U', 'R', 'F', 'D', 'L', 'B'];

/// Recover the wire-omitted 8th corner permutation/orientation entry from
/// the first 7, and the 12th edge entry from the first 11.
pub fn complete_parity(cp7: &[u8; 7], co7: &[u8; 7], ep11: &[u8; 11], eo11: &[u8; 11]) -> ([u8; 8], [u8; 8], [u8; 12], [u8; 12]) {
    let mut cp = [0u8; 8];
    cp[..7].copy_from_slice(cp7);
    cp[7] = (28 - cp7.iter().map(|&v| v as i32).sum::<i32>()) as u8;

    let mut co = [0u8; 8];
    co[..7].copy_from_slice(co7);
    let co_sum: i32 = co7.iter().map(|&v| v as i32).sum();
    co[7] = ((3 - co_sum.rem_euclid(3)) % 3) as u8;

    let mut ep = [0u8; 12];
    ep[..11].copy_from_slice(ep11);
    ep[11] = (66 - ep11.iter().map(|&v| v as i32).sum::<i32>()) as u8;

    let mut eo = [0u8; 12];
    eo[..11].copy_from_slice(eo11);
    let eo_sum: i32 = eo11.iter().map(|&v| v as i32).sum();
    eo[11] = ((2 - eo_sum.rem_euclid(2)) % 2) as u8;

    (cp, co, ep, eo)
}

/// Build the 54-character facelet string from fully-populated permutation and
/// orientation arrays.
pub fn to_facelets(cp: &[u8; 8], co: &[u8; 8], ep: &[u8; 12], eo: &[u8; 12]) -> String {
    let mut facelets = [' '; 54];
    for (face_index, letter) in FACE_LETTERS.iter().enumerate() {
        for slot in 0..9 {
            facelets[face_index * 9 + slot] = *letter;
        }
    }

    for i in 0..8 {
        for p in 0..3 {
            let dest = CORNER_MAP[i][(p + co[i] as usize) % 3];
            let source_index = CORNER_MAP[cp[i] as usize][p];
            facelets[dest] = FACE_LETTERS[source_index / 9];
        }
    }

    for i in 0..12 {
        for p in 0..2 {
            let dest = EDGE_MAP[i][(p + eo[i] as usize) % 2];
            let source_index = EDGE_MAP[ep[i] as usize][p];
            facelets[dest] = FACE_LETTERS[source_index / 9];
        }
    }

    facelets.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solved_state_produces_nine_of_each_face() {
        let cp = [0, 1, 2, 3, 4, 5, 6, 7];
        let co = [0u8; 8];
        let ep: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
        let eo = [0u8; 12];
        let facelets = to_facelets(&cp, &co, &ep, &eo);
        assert_eq!(facelets.len(), 54);
        for letter in FACE_LETTERS {
            assert_eq!(facelets.chars().filter(|&c| c == letter).count(), 9);
        }
    }

    #[test]
    fn parity_completion_matches_spec_example() {
        let cp7 = [0, 1, 2, 3, 4, 5, 6];
        let co7 = [0u8; 7];
        let ep11: [u8; 11] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let eo11 = [0u8; 11];
        let (cp, co, ep, eo) = complete_parity(&cp7, &co7, &ep11, &eo11);
        assert_eq!(cp, [0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(co, [0u8; 8]);
        assert_eq!(ep, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(eo, [0u8; 12]);
    }
}
