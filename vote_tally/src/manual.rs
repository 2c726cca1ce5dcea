/*!

This is the long-form manual for `vote_tally` and `bookvote`.

## Ballot formats

Votes are JSON objects, the same documents a web front-end posts when a member
votes. The shape depends on the active voting method.

### `plurality`

```text
{"book_id": "book_1"}
```

The identifier must be a non-empty string.

### `ranked_choice`

```text
{"ballot": ["book_3", "book_1", "book_2"]}
```

The books are listed from most to least preferred. The list must not be
empty. A book listed twice is either dropped after its first occurrence (the
default) or makes the whole ballot invalid, depending on the
`DuplicateCandidateMode`.

### `cumulative`

```text
{"ballot": {"book_1": 3, "book_2": 2}}
```

Every voter spreads a fixed budget of points (5 by default) across the books.
Points are non-negative integers and must add up to the budget exactly.

Invalid ballots are rejected as a whole and leave the results untouched.
Unknown book identifiers are counted like any other.

## Results

The public results are a flat JSON object from book identifiers to counts
(plurality), first preferences (ranked choice) or points (cumulative). They
are cheap to compute and can be polled.

The final results are the same flat object for plurality and cumulative
voting. For ranked choice, the instant-runoff count produces:

```text
{
  "winner": "book_2",
  "rounds": 2,
  "finalCounts": {"book_2": 2, "book_3": 1},
  "roundStats": [...]
}
```

`winner` is `"Tie"` when every ballot got exhausted. At most one round is run
per known book; if nobody reached a majority by then, the flat first
preference counts are returned instead.

When several books are tied for the fewest votes, the one to eliminate is
picked according to the `TieBreakMode`:
* `lexicographic` (default): the smallest identifier.
* `useCandidateOrder`: the book listed last in the book list.
* `random`: a reproducible order derived from `randomSeed`.

## Configuration

`bookvote` reads an election description in JSON:

```text
{
  "outputSettings": {"contestName": "Spring picks"},
  "votingSystem": "ranked_choice",
  "pointsPerVoter": 5,
  "tiebreakMode": "lexicographic",
  "books": [
    {"id": "book_1", "title": "Dune", "author": "Frank Herbert"},
    {"id": "book_2", "title": "Kindred", "author": "Octavia E. Butler"}
  ],
  "ballotSources": [{"provider": "json", "filePath": "ballots.json"}]
}
```

Unknown voting systems fall back to `plurality`.

Supported ballot providers:
* `json` a JSON array of ballots, as described above.
* `xlsx` an Excel spreadsheet, typically exported from an online form. The
  first row is a header, every other row is a ballot. `firstVoteColumnIndex`
  (1-based) is the first column holding choices. For cumulative voting, the
  header cells name the books and the cells hold the points.

Without a configuration file, `--input` and `--voting-system` are enough:

```bash
bookvote --input ballots.json --voting-system ranked_choice
```

The books are then inferred from the ballots.

The summary (settings, accepted and rejected ballots, public and final
results) is printed on the standard output, or written to the file given with
`--out`, or to `summary.json` in the `outputDirectory` of the configuration.
With `--reference`, it is compared to a previous summary and the differences
are printed.
 */
