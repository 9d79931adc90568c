use catalog_shelf::ratings::{RatingError, RatingStore};
use catalog_shelf::store::Documents;
use speculate2::speculate;

speculate! {
    before {
        let ratings = RatingStore::new(Documents::in_memory());
    }

    describe "set_rating" {
        it "rejects values below one" {
            assert!(matches!(ratings.set_rating("1", 0), Err(RatingError::OutOfRange(0))));
            assert!(matches!(ratings.set_rating("1", -3), Err(RatingError::OutOfRange(-3))));
        }

        it "rejects values above five" {
            assert!(matches!(ratings.set_rating("1", 6), Err(RatingError::OutOfRange(6))));
        }

        it "does not persist a rejected value" {
            let _ = ratings.set_rating("1", 6);
            assert_eq!(ratings.get_rating("1").expect("Query failed"), None);
        }

        it "overwrites the previous rating" {
            ratings.set_rating("1", 2).expect("Failed to rate");
            ratings.set_rating("1", 5).expect("Failed to rate");
            assert_eq!(ratings.get_rating("1").expect("Query failed"), Some(5));
        }
    }

    describe "get_rating" {
        it "returns the stored rating" {
            ratings.set_rating("42", 3).expect("Failed to rate");
            assert_eq!(ratings.get_rating("42").expect("Query failed"), Some(3));
        }

        it "returns None for an unrated entity" {
            assert_eq!(ratings.get_rating("42").expect("Query failed"), None);
        }
    }

    describe "all_ratings" {
        it "keeps each entity separate" {
            ratings.set_rating("1", 1).expect("Failed to rate");
            ratings.set_rating("2", 4).expect("Failed to rate");

            let all = ratings.all_ratings().expect("Query failed");
            assert_eq!(all.len(), 2);
            assert_eq!(all["1"], 1);
            assert_eq!(all["2"], 4);
        }
    }
}
